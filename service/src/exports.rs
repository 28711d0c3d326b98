//! 导出表
//!
//! 启动时一次性构建，之后只读。区段解析插件放在独立的注册表中，
//! 由 `GenericParser` 的工厂函数持有。

use alarm_core::{ExportRegistry, Job};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::jobs::{OperationFileExporter, OperationLogger};

pub fn build_registry(config: &AppConfig) -> ExportRegistry {
    let mut section_parsers = ExportRegistry::new();
    alarm_parser::register_section_parsers(&mut section_parsers);

    let mut registry = ExportRegistry::new();
    alarm_parser::register_exports(
        &mut registry,
        config.parser.control_file.clone(),
        Arc::new(section_parsers),
    );

    registry.register::<dyn Job, _>("OperationLogger", || Ok(Box::new(OperationLogger)));
    let exporter = config.jobs.file_exporter.clone();
    registry.register::<dyn Job, _>("OperationFileExporter", move || {
        Ok(Box::new(OperationFileExporter::new(exporter.clone())))
    });

    log::info!("[Registry] 共注册 {} 个导出", registry.exports().len());
    registry
}
