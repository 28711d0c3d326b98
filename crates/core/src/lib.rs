//! 传真报警接入的核心模型与扩展点

pub mod cancel;
pub mod extension;
pub mod operation;
pub mod property_path;
pub mod registry;
pub mod resources;

pub use cancel::CancellationToken;
pub use extension::{FaxParser, Job, SequenceSource};
pub use operation::{CustomData, Operation, OperationKeywords, PropertyLocation};
pub use registry::{ExportInfo, ExportRegistry};
pub use resources::{OperationResource, OperationResourceCollection};

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no export '{alias}' registered for {interface}")]
    ExportNotFound {
        interface: &'static str,
        alias: String,
    },
    #[error("failed to instantiate export '{alias}': {reason}")]
    Instantiate { alias: String, reason: String },
    #[error("parse failed: {0}")]
    Parse(String),
    #[error("job failed: {0}")]
    Job(String),
    #[error("sequence unavailable: {0}")]
    Sequence(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
