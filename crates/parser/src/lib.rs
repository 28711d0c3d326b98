//! 基于语法配置的传真文本解析
//!
//! 语法由区段（Section）、字段（Area）和区段解析插件组成，
//! 解析过程见 [`instance`]。

pub mod control;
pub mod instance;
pub mod section;
pub mod token;

pub use control::{
    AreaDefinition, ControlInformation, MatchString, SectionDefinition, SectionParserDefinition,
};
pub use instance::ParserInstance;
pub use section::{register_section_parsers, SectionOptions, SectionParser};
pub use token::{tokenize_line, AreaToken};

use alarm_core::{CoreError, ExportRegistry, FaxParser, Operation};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("无法读取语法文件 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("语法文件格式错误: {0}")]
    Json(#[from] serde_json::Error),
}

/// 通用解析器：同一份语法可被多次解析复用
pub struct GenericParser {
    control: Arc<ControlInformation>,
    section_parsers: Arc<ExportRegistry>,
}

impl GenericParser {
    pub fn new(control: Arc<ControlInformation>, section_parsers: Arc<ExportRegistry>) -> Self {
        for section in &control.sections {
            for binding in &section.parsers {
                if !section_parsers.contains::<dyn SectionParser>(&binding.parser_type) {
                    log::warn!(
                        "[Parser] 区段 '{}' 引用的插件 '{}' 未注册，将被忽略",
                        section.name(),
                        binding.parser_type
                    );
                }
            }
        }
        Self {
            control,
            section_parsers,
        }
    }
}

impl FaxParser for GenericParser {
    fn parse(&self, lines: &[String]) -> alarm_core::Result<Operation> {
        ParserInstance::new(&self.control, &self.section_parsers).parse(lines)
    }
}

impl From<ParserError> for CoreError {
    fn from(err: ParserError) -> Self {
        CoreError::InvalidConfig(err.to_string())
    }
}

/// 向注册表登记 `GenericParser`
///
/// 语法文件在实例化时读取，文件缺失或格式错误会作为工厂错误交给调用方。
pub fn register_exports(
    registry: &mut ExportRegistry,
    control_file: PathBuf,
    section_parsers: Arc<ExportRegistry>,
) {
    registry.register::<dyn FaxParser, _>("GenericParser", move || {
        let control = ControlInformation::load(&control_file)?;
        Ok(Box::new(GenericParser::new(
            Arc::new(control),
            section_parsers.clone(),
        )))
    });
}
