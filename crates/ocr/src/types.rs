//! OCR 类型定义

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// OCR 引擎类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineType {
    /// Tesseract OCR (CLI)
    #[default]
    Tesseract,
    /// Cuneiform OCR (CLI)
    Cuneiform,
}

impl OcrEngineType {
    fn executable(self) -> &'static str {
        match (self, cfg!(windows)) {
            (OcrEngineType::Tesseract, false) => "tesseract",
            (OcrEngineType::Tesseract, true) => "tesseract.exe",
            (OcrEngineType::Cuneiform, false) => "cuneiform",
            (OcrEngineType::Cuneiform, true) => "cuneiform.exe",
        }
    }
}

impl std::fmt::Display for OcrEngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OcrEngineType::Tesseract => write!(f, "tesseract"),
            OcrEngineType::Cuneiform => write!(f, "cuneiform"),
        }
    }
}

/// OCR 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OcrConfig {
    /// 使用的引擎
    pub engine: OcrEngineType,
    /// 引擎安装目录，同时作为子进程工作目录
    pub install_path: Option<String>,
    /// 可执行文件路径（覆盖安装目录推导）
    pub binary_path: Option<String>,
    /// tessdata 目录路径（仅 Tesseract）
    pub tessdata_path: Option<String>,
    /// 识别语言，Tesseract 默认 "deu"，Cuneiform 默认 "ger"
    pub language: Option<String>,
    /// 页面分割模式 (0-13)，仅 Tesseract
    pub psm: Option<u8>,
    /// 单页识别超时（秒）
    pub timeout_secs: Option<u64>,
}

impl OcrConfig {
    pub fn language_or_default(&self) -> &str {
        self.language
            .as_deref()
            .unwrap_or(match self.engine {
                OcrEngineType::Tesseract => "deu",
                OcrEngineType::Cuneiform => "ger",
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(300).max(1))
    }

    /// 可执行文件：显式路径 > 安装目录下的默认文件名 > PATH 中查找
    pub fn binary(&self) -> PathBuf {
        if let Some(binary) = &self.binary_path {
            return PathBuf::from(binary);
        }
        let executable = self.engine.executable();
        match &self.install_path {
            Some(dir) => PathBuf::from(dir).join(executable),
            None => PathBuf::from(executable),
        }
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        self.install_path.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_engine() {
        let mut config = OcrConfig::default();
        assert_eq!(config.engine, OcrEngineType::Tesseract);
        assert_eq!(config.language_or_default(), "deu");

        config.engine = OcrEngineType::Cuneiform;
        assert_eq!(config.language_or_default(), "ger");
        assert_eq!(config.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_binary_resolution() {
        let mut config = OcrConfig {
            install_path: Some("/opt/tesseract".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.binary(),
            PathBuf::from("/opt/tesseract").join(OcrEngineType::Tesseract.executable())
        );

        config.binary_path = Some("/usr/local/bin/tesseract5".to_string());
        assert_eq!(config.binary(), PathBuf::from("/usr/local/bin/tesseract5"));
    }

    #[test]
    fn test_engine_type_serde() {
        let engine: OcrEngineType = serde_json::from_str("\"cuneiform\"").unwrap();
        assert_eq!(engine, OcrEngineType::Cuneiform);
        assert_eq!(engine.to_string(), "cuneiform");
    }
}
