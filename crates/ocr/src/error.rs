//! OCR 错误类型

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("无法启动 OCR 引擎 {program}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR 引擎异常退出 (code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("OCR 引擎超时 ({0:?})，已终止")]
    Timeout(Duration),

    #[error("OCR 已取消")]
    Cancelled,

    #[error("OCR 输出文件缺失: {0}")]
    MissingOutput(PathBuf),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
