//! 将警情导出为文件，供其他系统（显示屏、打印）读取

use alarm_core::{CoreError, Job, Operation};
use chrono::Local;
use std::fs;
use std::path::PathBuf;

use crate::config::{ExportFormat, FileExporterConfig};

pub struct OperationFileExporter {
    settings: FileExporterConfig,
}

impl OperationFileExporter {
    pub fn new(settings: FileExporterConfig) -> Self {
        Self { settings }
    }

    /// `{目标目录}/{时间}_{编号}.{json|txt}`
    pub fn target_path(&self, operation: &Operation) -> PathBuf {
        let timestamp = operation.timestamp.unwrap_or_else(Local::now);
        let extension = match self.settings.format {
            ExportFormat::Json => "json",
            ExportFormat::Template => "txt",
        };
        self.settings.destination_path.join(format!(
            "{}_{}.{}",
            timestamp.format("%Y%m%d%H%M%S"),
            operation.id,
            extension
        ))
    }

    fn render(&self, operation: &Operation) -> alarm_core::Result<String> {
        match self.settings.format {
            ExportFormat::Json => serde_json::to_string_pretty(operation)
                .map_err(|err| CoreError::Job(format!("serialize operation: {}", err))),
            ExportFormat::Template => Ok(operation.format(&self.settings.template)),
        }
    }
}

impl Job for OperationFileExporter {
    fn initialize(&mut self) -> alarm_core::Result<()> {
        if self.settings.format == ExportFormat::Template && self.settings.template.trim().is_empty() {
            return Err(CoreError::InvalidConfig(
                "template export selected without a template".to_string(),
            ));
        }
        fs::create_dir_all(&self.settings.destination_path)?;
        Ok(())
    }

    fn execute(&mut self, operation: &Operation) -> alarm_core::Result<()> {
        let content = self.render(operation)?;
        let path = self.target_path(operation);
        fs::write(&path, content)?;
        log::info!("[Jobs] 警情 #{} 已导出到 {}", operation.id, path.display());
        Ok(())
    }
}
