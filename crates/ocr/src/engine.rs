//! OCR 引擎 trait 定义

use alarm_core::CancellationToken;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::OcrError;
use crate::process::{self, OcrCommand};
use crate::types::{OcrConfig, OcrEngineType};
use crate::{CuneiformEngine, TesseractEngine};

/// OCR 引擎统一 trait
pub trait OcrEngine: Send {
    fn engine_type(&self) -> OcrEngineType;

    /// 构建单页识别命令
    ///
    /// `output_base` 不含扩展名，各引擎自行决定实际输出文件名，
    /// 通过 [`OcrCommand::output`] 告知调用方。
    fn build_command(&self, image: &Path, output_base: &Path) -> OcrCommand;

    fn timeout(&self) -> Duration;

    /// 识别单页图片，返回文本行
    fn recognize(
        &self,
        image: &Path,
        output_base: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, OcrError> {
        let command = self.build_command(image, output_base);
        // 旧的输出文件会掩盖引擎未写出结果的情况
        if command.output.exists() {
            fs::remove_file(&command.output)?;
        }

        process::run(&command, self.timeout(), cancel)?;

        let lines = read_output(&command.output)?;
        log::info!(
            "[Ocr] {} 识别 {} 完成，共 {} 行",
            self.engine_type(),
            image.display(),
            lines.len()
        );
        Ok(lines)
    }
}

/// 按配置创建引擎
pub fn create_engine(config: &OcrConfig) -> Box<dyn OcrEngine> {
    match config.engine {
        OcrEngineType::Tesseract => Box::new(TesseractEngine::new(config.clone())),
        OcrEngineType::Cuneiform => Box::new(CuneiformEngine::new(config.clone())),
    }
}

/// 在路径后追加后缀（不替换已有扩展名）
pub(crate) fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = base.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

/// 读取引擎输出，容忍非 UTF-8 字节，去掉换页符
pub fn read_output(path: &Path) -> Result<Vec<String>, OcrError> {
    if !path.exists() {
        return Err(OcrError::MissingOutput(path.to_path_buf()));
    }
    let raw = fs::read(path)?;
    let text = String::from_utf8_lossy(&raw);
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches(['\r', '\u{c}']).to_string())
        .collect())
}
