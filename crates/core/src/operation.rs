//! 警情记录（Operation）
//!
//! 一份传真解析后的结构化结果。解析过程中逐行填充，
//! 解析成功后才由外部序列分配 `id`，此后以 `id` 判等。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::property_path;
use crate::resources::OperationResourceCollection;

/// 地点信息，事发地（Einsatzort）与目的地（Zielort）共用
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertyLocation {
    /// 地点名称
    pub location: String,
    pub zip_code: String,
    pub city: String,
    pub street: String,
    pub street_number: String,
    /// 交叉路口
    pub intersection: String,
    /// 建筑物 / 对象
    pub property: String,
    pub geo_latitude: String,
    pub geo_longitude: String,
}

impl PropertyLocation {
    pub fn is_empty(&self) -> bool {
        self.zip_code.is_empty()
            && self.city.is_empty()
            && self.street.is_empty()
            && self.street_number.is_empty()
    }
}

impl fmt::Display for PropertyLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let street = format!("{} {}", self.street, self.street_number);
        let city = format!("{} {}", self.zip_code, self.city);
        match (street.trim(), city.trim()) {
            ("", city) => write!(f, "{}", city),
            (street, "") => write!(f, "{}", street),
            (street, city) => write!(f, "{}, {}", street, city),
        }
    }
}

/// 关键字（Stichwort）集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationKeywords {
    pub keyword: String,
    pub emergency_keyword: String,
    /// 火灾类（B）
    pub b: String,
    /// 救援类（R）
    pub r: String,
    /// 特殊类（S）
    pub s: String,
    /// 技术援助类（T）
    pub t: String,
}

impl fmt::Display for OperationKeywords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.keyword, &self.b, &self.r, &self.s, &self.t]
            .into_iter()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        write!(f, "{}", parts.join(" / "))
    }
}

/// 无固定字段的数据
///
/// 键永远不会与 Operation 的已知属性路径重名。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomData {
    entries: BTreeMap<String, String>,
}

impl CustomData {
    /// 写入条目；键为已知属性路径时拒绝写入并返回 `false`
    pub fn insert(&mut self, key: &str, value: &str) -> bool {
        if property_path::is_known(key) {
            log::warn!("[CustomData] 键 '{}' 与属性路径重名，已拒绝", key);
            return false;
        }
        if let Some(previous) = self.entries.insert(key.to_string(), value.to_string()) {
            log::warn!(
                "[CustomData] 覆盖已有条目 '{}': '{}' -> '{}'",
                key,
                previous,
                value
            );
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Operation {
    /// 外部序列分配的编号，0 表示尚未分配
    pub id: i64,
    /// 收到传真的时间
    pub timestamp_income: DateTime<Local>,
    /// 警情时间，解析不到时由接入流程补为当前时间
    pub timestamp: Option<DateTime<Local>>,
    pub operation_number: String,
    /// 报警人
    pub messenger: String,
    pub priority: String,
    pub comment: String,
    pub picture: String,
    pub operation_plan: String,
    /// 事发地
    pub location: PropertyLocation,
    /// 目的地
    pub destination: PropertyLocation,
    pub keywords: OperationKeywords,
    pub resources: OperationResourceCollection,
    pub custom_data: CustomData,
    pub is_acknowledged: bool,
}

impl Default for Operation {
    fn default() -> Self {
        Self {
            id: 0,
            timestamp_income: Local::now(),
            timestamp: None,
            operation_number: String::new(),
            messenger: String::new(),
            priority: String::new(),
            comment: String::new(),
            picture: String::new(),
            operation_plan: String::new(),
            location: PropertyLocation::default(),
            destination: PropertyLocation::default(),
            keywords: OperationKeywords::default(),
            resources: OperationResourceCollection::default(),
            custom_data: CustomData::default(),
            is_acknowledged: false,
        }
    }
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按属性路径写值，路径未知时落入 custom data
    pub fn write_value(&mut self, path: &str, value: &str) {
        property_path::write_value(self, path, value);
    }

    /// 用 `{路径}` 占位符渲染模板
    pub fn format(&self, template: &str) -> String {
        property_path::format(self, template)
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Operation {}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] {} @ {}",
            self.id, self.operation_number, self.keywords, self.location
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_id() {
        let mut a = Operation::new();
        let mut b = Operation::new();
        a.id = 7;
        b.id = 7;
        b.comment = "anders".to_string();
        assert_eq!(a, b);

        b.id = 8;
        assert_ne!(a, b);
    }

    #[test]
    fn test_custom_data_rejects_property_paths() {
        let mut data = CustomData::default();
        assert!(!data.insert("location.street", "x"));
        assert!(!data.insert("Comment", "x"));
        assert!(data.insert("Funkrufname", "Florian 1"));
        assert!(data.insert("Funkrufname", "Florian 2"));
        assert_eq!(data.get("Funkrufname"), Some("Florian 2"));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_location_display() {
        let location = PropertyLocation {
            street: "Hauptstr.".to_string(),
            street_number: "5".to_string(),
            zip_code: "12345".to_string(),
            city: "Springfield".to_string(),
            ..Default::default()
        };
        assert_eq!(location.to_string(), "Hauptstr. 5, 12345 Springfield");
        assert_eq!(PropertyLocation::default().to_string(), "");
    }

    #[test]
    fn test_operation_json_roundtrip_keeps_fields() {
        let mut operation = Operation::new();
        operation.id = 3;
        operation.keywords.b = "B 3".to_string();
        operation.resources.add_equipment("FF Nord", "LF");
        operation.custom_data.insert("Sondersignal", "ja");

        let json = serde_json::to_string(&operation).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keywords.b, "B 3");
        assert_eq!(back.resources.len(), 1);
        assert_eq!(back.custom_data.get("Sondersignal"), Some("ja"));
    }
}
