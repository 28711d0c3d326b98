//! 单次解析
//!
//! 1. 分段：逐行匹配区段标记，遇到不同区段时开启新区段；与当前区段相同的标记
//!    按普通内容处理；第一个区段之前的行丢弃。
//! 2. 分词：每个区段的有效关键字 = 字段关键字 ∪ 插件关键字。
//! 3. 填充：按文档顺序回调插件并把字段值写入 Operation。

use alarm_core::{CoreError, ExportRegistry, Operation, Result};

use crate::control::{ControlInformation, SectionDefinition};
use crate::section::SectionParser;
use crate::token::{tokenize_line, AreaToken};

struct Section<'c> {
    definition: &'c SectionDefinition,
    lines: Vec<String>,
    parsers: Vec<Box<dyn SectionParser>>,
    tokens: Vec<AreaToken>,
}

impl<'c> Section<'c> {
    fn keywords(&self) -> Vec<String> {
        self.definition
            .areas
            .iter()
            .map(|a| a.keyword().to_string())
            .chain(self.parsers.iter().flat_map(|p| p.tokens()))
            .collect()
    }
}

pub struct ParserInstance<'c> {
    control: &'c ControlInformation,
    section_parsers: &'c ExportRegistry,
}

impl<'c> ParserInstance<'c> {
    pub fn new(control: &'c ControlInformation, section_parsers: &'c ExportRegistry) -> Self {
        Self {
            control,
            section_parsers,
        }
    }

    /// 解析文本行；整份文本中找不到任何区段时视为语法不匹配
    pub fn parse(&self, lines: &[String]) -> Result<Operation> {
        let mut sections = self.sectionize(lines);
        if sections.is_empty() {
            return Err(CoreError::Parse(format!(
                "{} 行文本中没有匹配任何区段标记",
                lines.len()
            )));
        }

        for section in &mut sections {
            let keywords = section.keywords();
            section.tokens = section
                .lines
                .iter()
                .flat_map(|line| tokenize_line(line, &keywords))
                .collect();
        }

        let mut operation = Operation::new();
        for section in &mut sections {
            populate(section, &mut operation);
        }
        Ok(operation)
    }

    fn sectionize(&self, lines: &[String]) -> Vec<Section<'c>> {
        let mut sections: Vec<Section<'c>> = Vec::new();

        for line in lines {
            let marker = line.trim();
            if marker.is_empty() {
                continue;
            }

            if let Some(definition) = self.control.section_for(marker) {
                let same = sections
                    .last()
                    .map_or(false, |open| std::ptr::eq(open.definition, definition));
                if !same {
                    log::debug!("[Parser] 进入区段 '{}'", definition.name());
                    sections.push(self.open_section(definition));
                    continue;
                }
            }

            // 原样保留，缩进由分词与插件自行处理
            match sections.last_mut() {
                Some(open) => open.lines.push(line.clone()),
                None => log::debug!("[Parser] 丢弃区段外的行: {}", line),
            }
        }
        sections
    }

    fn open_section(&self, definition: &'c SectionDefinition) -> Section<'c> {
        let mut parsers = Vec::with_capacity(definition.parsers.len());

        for binding in &definition.parsers {
            match self
                .section_parsers
                .resolve_named::<dyn SectionParser>(&binding.parser_type)
            {
                Ok(Some(mut parser)) => {
                    parser.on_load(&binding.options);
                    parsers.push(parser);
                }
                Ok(None) => log::warn!(
                    "[Parser] 区段 '{}' 引用了未知的解析插件 '{}'",
                    definition.name(),
                    binding.parser_type
                ),
                Err(err) => log::warn!(
                    "[Parser] 区段 '{}' 的解析插件 '{}' 创建失败: {}",
                    definition.name(),
                    binding.parser_type,
                    err
                ),
            }
        }

        Section {
            definition,
            lines: Vec::new(),
            parsers,
            tokens: Vec::new(),
        }
    }
}

fn populate(section: &mut Section<'_>, operation: &mut Operation) {
    for parser in &mut section.parsers {
        parser.on_enter_section(operation);
    }

    for token in &section.tokens {
        log::debug!(
            "[Parser] [{}] '{}' = '{}'",
            section.definition.name(),
            token.identifier,
            token.value
        );

        if !token.is_passthrough() {
            if let Some(area) = section.definition.area_for(&token.identifier) {
                operation.write_value(&area.map_to, area.strip_separator(&token.value));
            }
        }

        for parser in &mut section.parsers {
            parser.populate(token, operation);
        }
    }

    for parser in &mut section.parsers {
        parser.on_leave_section(operation);
    }
}
