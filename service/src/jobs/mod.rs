//! 内置任务

mod file_exporter;
mod logger;

pub use file_exporter::OperationFileExporter;
pub use logger::OperationLogger;
