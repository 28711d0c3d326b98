//! 区段解析插件
//!
//! 插件绑定到语法中的某个区段，在进入区段、每个 token、离开区段时被回调，
//! 用于字段映射无法表达的逻辑（拆分邮编与城市、累积资源条目等）。
//! 插件通过 [`ExportRegistry`] 以别名注册，语法中的 `type` 即为别名。

mod comment;
mod keyword;
mod location;
mod resource;

pub use comment::CommentSectionParser;
pub use keyword::KeywordSectionParser;
pub use location::PropertyLocationSectionParser;
pub use resource::ResourceSectionParser;

use alarm_core::{ExportRegistry, Operation};
use std::collections::BTreeMap;

use crate::token::AreaToken;

pub type SectionOptions = BTreeMap<String, String>;

/// 区段解析插件接口
pub trait SectionParser: Send {
    /// 读取语法中为该插件配置的选项
    fn on_load(&mut self, _options: &SectionOptions) {}

    /// 插件额外识别的关键字
    fn tokens(&self) -> Vec<String>;

    fn on_enter_section(&mut self, _operation: &mut Operation) {}

    fn populate(&mut self, token: &AreaToken, operation: &mut Operation);

    fn on_leave_section(&mut self, _operation: &mut Operation) {}
}

/// 注册内置插件
///
/// 每个插件同时以短名与完整类型名注册。
pub fn register_section_parsers(registry: &mut ExportRegistry) {
    for alias in ["Keyword", "KeywordSectionParser"] {
        registry.register::<dyn SectionParser, _>(alias, || {
            Ok(Box::new(KeywordSectionParser::default()))
        });
    }
    for alias in ["PropertyLocation", "PropertyLocationSectionParser"] {
        registry.register::<dyn SectionParser, _>(alias, || {
            Ok(Box::new(PropertyLocationSectionParser::default()))
        });
    }
    for alias in ["Resource", "ResourceSectionParser"] {
        registry.register::<dyn SectionParser, _>(alias, || {
            Ok(Box::new(ResourceSectionParser::default()))
        });
    }
    for alias in ["Comment", "CommentSectionParser"] {
        registry.register::<dyn SectionParser, _>(alias, || {
            Ok(Box::new(CommentSectionParser::default()))
        });
    }
}

/// 读取选项，缺失或为空时使用默认值
fn option(options: &SectionOptions, key: &str, default: &str) -> String {
    options
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}
