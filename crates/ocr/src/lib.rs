//! 外部 OCR 引擎调用
//!
//! 将一页栅格图片交给外部 OCR 可执行文件识别，读取其输出的文本行。
//! 支持两种可互换的引擎（Tesseract、Cuneiform），各自的参数与输出路径约定
//! 由引擎实现封装，调用方只提供不含扩展名的输出基路径。

mod cuneiform;
mod engine;
mod error;
mod process;
mod tesseract;
mod types;

pub use cuneiform::CuneiformEngine;
pub use engine::{create_engine, read_output, OcrEngine};
pub use error::OcrError;
pub use process::{run, OcrCommand};
pub use tesseract::{probe_version, TesseractEngine};
pub use types::{OcrConfig, OcrEngineType};
