//! 语法定义：区段、字段与区段解析插件的绑定
//!
//! 启动时从 JSON 加载一次，之后只读。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::token::find_ignore_case;
use crate::ParserError;

/// 匹配串
///
/// `is_contained = true` 时行内包含即匹配，否则要求整行（去空白后）相等。
/// 两种方式都忽略大小写。JSON 中也可直接写字符串，视为包含匹配。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MatchStringRepr", rename_all = "camelCase")]
pub struct MatchString {
    pub string: String,
    pub is_contained: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MatchStringRepr {
    Plain(String),
    #[serde(rename_all = "camelCase")]
    Full {
        string: String,
        #[serde(default = "default_true")]
        is_contained: bool,
    },
}

fn default_true() -> bool {
    true
}

impl From<MatchStringRepr> for MatchString {
    fn from(repr: MatchStringRepr) -> Self {
        match repr {
            MatchStringRepr::Plain(string) => MatchString::contained(string),
            MatchStringRepr::Full {
                string,
                is_contained,
            } => MatchString {
                string,
                is_contained,
            },
        }
    }
}

impl Default for MatchString {
    fn default() -> Self {
        MatchString::contained(String::new())
    }
}

impl MatchString {
    pub fn contained(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            is_contained: true,
        }
    }

    pub fn exact(string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            is_contained: false,
        }
    }

    pub fn is_match(&self, line: &str) -> bool {
        if self.string.is_empty() {
            return false;
        }
        if self.is_contained {
            find_ignore_case(line, &self.string).is_some()
        } else {
            line.trim().to_lowercase() == self.string.trim().to_lowercase()
        }
    }
}

/// 字段定义：关键字 -> Operation 属性路径
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AreaDefinition {
    /// 仅用于展示
    pub name: String,
    pub area_string: MatchString,
    /// 点分属性路径，解析不到时作为 custom data 键
    pub map_to: String,
    /// 关键字与值之间的分隔符
    pub separator: String,
}

impl Default for AreaDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            area_string: MatchString::default(),
            map_to: String::new(),
            separator: ":".to_string(),
        }
    }
}

impl AreaDefinition {
    pub fn new(keyword: &str, map_to: &str) -> Self {
        Self {
            name: keyword.to_string(),
            area_string: MatchString::contained(keyword),
            map_to: map_to.to_string(),
            ..Self::default()
        }
    }

    pub fn keyword(&self) -> &str {
        &self.area_string.string
    }

    /// 去掉值开头的自定义分隔符（冒号已由分词器处理）
    pub fn strip_separator<'v>(&self, value: &'v str) -> &'v str {
        let separator = self.separator.trim();
        if separator.is_empty() || separator == ":" {
            return value;
        }
        value.strip_prefix(separator).map(str::trim).unwrap_or(value)
    }

    fn is_valid(&self) -> bool {
        !self.keyword().is_empty() && !self.map_to.trim().is_empty()
    }
}

/// 区段解析插件引用
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SectionParserDefinition {
    /// 注册表中的别名
    #[serde(rename = "type")]
    pub parser_type: String,
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SectionDefinition {
    /// 区段起始标记
    pub text: MatchString,
    pub parsers: Vec<SectionParserDefinition>,
    pub areas: Vec<AreaDefinition>,
}

impl SectionDefinition {
    pub fn new(marker: &str) -> Self {
        Self {
            text: MatchString::contained(marker),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.text.string
    }

    pub fn area(mut self, keyword: &str, map_to: &str) -> Self {
        self.areas.push(AreaDefinition::new(keyword, map_to));
        self
    }

    pub fn parser(mut self, parser_type: &str, options: &[(&str, &str)]) -> Self {
        self.parsers.push(SectionParserDefinition {
            parser_type: parser_type.to_string(),
            options: options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    /// 按关键字精确查找字段定义
    pub fn area_for(&self, identifier: &str) -> Option<&AreaDefinition> {
        self.areas.iter().find(|a| a.keyword() == identifier)
    }
}

/// 完整语法
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlInformation {
    pub sections: Vec<SectionDefinition>,
}

impl ControlInformation {
    pub fn load(path: &Path) -> Result<Self, ParserError> {
        let raw = fs::read_to_string(path).map_err(|source| ParserError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let control = Self::from_json(&raw)?;
        log::info!(
            "[Parser] 已加载语法 {}，共 {} 个区段",
            path.display(),
            control.sections.len()
        );
        Ok(control)
    }

    pub fn from_json(raw: &str) -> Result<Self, ParserError> {
        let mut control: ControlInformation = serde_json::from_str(raw)?;
        control.sanitize();
        Ok(control)
    }

    /// 首个匹配该行的区段
    pub fn section_for(&self, line: &str) -> Option<&SectionDefinition> {
        self.sections.iter().find(|s| s.text.is_match(line))
    }

    /// 丢弃无标记的区段以及缺关键字或目标路径的字段
    fn sanitize(&mut self) {
        self.sections.retain(|section| {
            if section.name().trim().is_empty() {
                log::warn!("[Parser] 忽略没有起始标记的区段定义");
                return false;
            }
            true
        });

        for section in &mut self.sections {
            let marker = section.text.string.clone();
            section.areas.retain(|area| {
                if !area.is_valid() {
                    log::warn!(
                        "[Parser] 区段 '{}' 中的字段 '{}' 缺少关键字或映射路径，已忽略",
                        marker,
                        area.name
                    );
                    return false;
                }
                true
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRAMMAR: &str = r#"{
        "sections": [
            {
                "text": {"string": "EINSATZORT", "isContained": true},
                "parsers": [{"type": "PropertyLocation", "options": {"AffectedLocation": "Einsatzort"}}],
                "areas": [
                    {"name": "Straße", "areaString": "Straße", "mapTo": "location.street"},
                    {"name": "kaputt", "areaString": "", "mapTo": "x"}
                ]
            },
            {"text": {"string": "BEMERKUNG", "isContained": false}},
            {"text": ""}
        ]
    }"#;

    #[test]
    fn test_load_and_sanitize() {
        let control = ControlInformation::from_json(GRAMMAR).unwrap();
        assert_eq!(control.sections.len(), 2);

        let first = &control.sections[0];
        assert_eq!(first.areas.len(), 1);
        assert_eq!(first.areas[0].separator, ":");
        assert!(first.areas[0].area_string.is_contained);
        assert_eq!(first.parsers[0].parser_type, "PropertyLocation");
        assert_eq!(first.parsers[0].options["AffectedLocation"], "Einsatzort");
    }

    #[test]
    fn test_marker_matching() {
        let control = ControlInformation::from_json(GRAMMAR).unwrap();
        assert_eq!(
            control.section_for("---- Einsatzort ----").map(|s| s.name()),
            Some("EINSATZORT")
        );
        assert_eq!(
            control.section_for("  bemerkung ").map(|s| s.name()),
            Some("BEMERKUNG")
        );
        assert!(control.section_for("BEMERKUNG folgt").is_none());
    }

    #[test]
    fn test_custom_separator() {
        let mut area = AreaDefinition::new("Objekt", "location.property");
        assert_eq!(area.strip_separator("= Schule"), "= Schule");
        area.separator = "=".to_string();
        assert_eq!(area.strip_separator("= Schule"), "Schule");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("control.json");
        fs::write(&path, GRAMMAR).unwrap();
        assert_eq!(ControlInformation::load(&path).unwrap().sections.len(), 2);
        assert!(ControlInformation::load(&dir.path().join("missing.json")).is_err());
    }
}
