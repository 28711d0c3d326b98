//! 属性路径表
//!
//! 语法配置中的 `mapTo` 使用点分路径（如 `location.street`）指向 Operation 上的字段。
//! 可映射字段是有限且固定的，因此这里维护一张 路径 -> 读写函数 的静态表，
//! 而不是在运行时做反射。路径比较忽略大小写与下划线，
//! 并接受 `Einsatzort.` / `Zielort.` 作为 `location.` / `destination.` 的别名。

use chrono::{Local, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::operation::Operation;

type Getter = fn(&Operation) -> String;
type Setter = fn(&mut Operation, &str);

struct PathEntry {
    path: &'static str,
    get: Getter,
    set: Setter,
}

/// 警情时间支持的文本格式
const TIMESTAMP_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

macro_rules! text_field {
    ($path:expr, $($field:ident).+) => {
        PathEntry {
            path: $path,
            get: |op: &Operation| -> String { op.$($field).+.clone() },
            set: |op: &mut Operation, value: &str| op.$($field).+ = value.to_string(),
        }
    };
}

macro_rules! location_fields {
    ($prefix:literal, $loc:ident) => {
        [
            text_field!(concat!($prefix, ".location"), $loc.location),
            text_field!(concat!($prefix, ".zipcode"), $loc.zip_code),
            text_field!(concat!($prefix, ".city"), $loc.city),
            text_field!(concat!($prefix, ".street"), $loc.street),
            text_field!(concat!($prefix, ".streetnumber"), $loc.street_number),
            text_field!(concat!($prefix, ".intersection"), $loc.intersection),
            text_field!(concat!($prefix, ".property"), $loc.property),
            text_field!(concat!($prefix, ".geolatitude"), $loc.geo_latitude),
            text_field!(concat!($prefix, ".geolongitude"), $loc.geo_longitude),
        ]
    };
}

static ENTRIES: Lazy<HashMap<&'static str, PathEntry>> = Lazy::new(|| {
    let mut entries = vec![
        text_field!("operationnumber", operation_number),
        text_field!("messenger", messenger),
        text_field!("priority", priority),
        text_field!("comment", comment),
        text_field!("picture", picture),
        text_field!("operationplan", operation_plan),
        text_field!("keywords.keyword", keywords.keyword),
        text_field!("keywords.emergencykeyword", keywords.emergency_keyword),
        text_field!("keywords.b", keywords.b),
        text_field!("keywords.r", keywords.r),
        text_field!("keywords.s", keywords.s),
        text_field!("keywords.t", keywords.t),
        PathEntry {
            path: "timestamp",
            get: |op: &Operation| -> String {
                op.timestamp
                    .map(|t| t.format(TIMESTAMP_FORMATS[0]).to_string())
                    .unwrap_or_default()
            },
            set: |op: &mut Operation, value: &str| match parse_timestamp(value) {
                Some(timestamp) => op.timestamp = Some(timestamp),
                None => log::warn!("[Operation] 无法识别的时间格式: '{}'", value),
            },
        },
        PathEntry {
            path: "isacknowledged",
            get: |op: &Operation| -> String { op.is_acknowledged.to_string() },
            set: |op: &mut Operation, value: &str| {
                op.is_acknowledged = matches!(
                    value.trim().to_lowercase().as_str(),
                    "true" | "1" | "ja" | "yes"
                )
            },
        },
        PathEntry {
            path: "resources",
            get: |op: &Operation| -> String { op.resources.to_single_line() },
            set: |op: &mut Operation, value: &str| {
                op.resources.get_or_create(value);
            },
        },
    ];
    entries.extend(location_fields!("location", location));
    entries.extend(location_fields!("destination", destination));

    entries.into_iter().map(|e| (e.path, e)).collect()
});

/// 规范化路径：去空白、下划线，小写，并展开别名前缀
fn normalize(path: &str) -> String {
    let compact: String = path
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect();

    for (alias, target) in [("einsatzort.", "location."), ("zielort.", "destination.")] {
        if let Some(rest) = compact.strip_prefix(alias) {
            return format!("{}{}", target, rest);
        }
    }
    compact
}

fn lookup(path: &str) -> Option<&'static PathEntry> {
    ENTRIES.get(normalize(path).as_str())
}

pub fn is_known(path: &str) -> bool {
    lookup(path).is_some()
}

/// 写入已知属性；路径未知时返回 `false`
pub fn set(operation: &mut Operation, path: &str, value: &str) -> bool {
    match lookup(path) {
        Some(entry) => {
            (entry.set)(operation, value);
            true
        }
        None => false,
    }
}

/// 读取已知属性
pub fn get(operation: &Operation, path: &str) -> Option<String> {
    lookup(path).map(|entry| (entry.get)(operation))
}

/// 写入属性，未知路径按原样作为 custom data 的键
pub fn write_value(operation: &mut Operation, path: &str, value: &str) {
    if set(operation, path, value) {
        return;
    }
    log::debug!("[Operation] 路径 '{}' 无对应属性，写入 custom data", path);
    operation.custom_data.insert(path, value);
}

/// 渲染 `{路径}` 模板
///
/// 先查属性表，再查 custom data，都没有则替换为空串。`{{` 输出字面量 `{`。
pub fn format(operation: &Operation, template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        if let Some(stripped) = after.strip_prefix('{') {
            out.push('{');
            rest = stripped;
            continue;
        }

        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                let value = get(operation, key)
                    .or_else(|| operation.custom_data.get(key).map(str::to_string))
                    .unwrap_or_default();
                out.push_str(&value);
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn parse_timestamp(value: &str) -> Option<chrono::DateTime<Local>> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
}
