//! Tesseract OCR 引擎实现（CLI 包装）
//!
//! 调用形式：`tesseract <image> <outbase> -l deu [--psm N]`，
//! 结果写入 `<outbase>.txt`。

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use crate::engine::{with_suffix, OcrEngine};
use crate::error::OcrError;
use crate::process::OcrCommand;
use crate::types::{OcrConfig, OcrEngineType};

/// Tesseract OCR 引擎
pub struct TesseractEngine {
    config: OcrConfig,
}

impl TesseractEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

impl OcrEngine for TesseractEngine {
    fn engine_type(&self) -> OcrEngineType {
        OcrEngineType::Tesseract
    }

    fn build_command(&self, image: &Path, output_base: &Path) -> OcrCommand {
        let mut args = vec![
            image.display().to_string(),
            output_base.display().to_string(),
            "-l".to_string(),
            self.config.language_or_default().to_string(),
        ];
        if let Some(psm) = self.config.psm {
            args.push("--psm".to_string());
            args.push(psm.to_string());
        }

        // 设置 tessdata 路径
        let envs = self
            .config
            .tessdata_path
            .iter()
            .map(|path| ("TESSDATA_PREFIX".to_string(), path.clone()))
            .collect();

        OcrCommand {
            program: self.config.binary(),
            args,
            envs,
            working_dir: self.config.working_dir(),
            output: with_suffix(output_base, ".txt"),
            stderr_log: with_suffix(output_base, ".stderr.log"),
        }
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }
}

/// 获取引擎版本（`--version` 输出的第一行非空内容）
pub fn probe_version(config: &OcrConfig) -> Result<String, OcrError> {
    let program = config.binary();
    let output = Command::new(&program)
        .arg("--version")
        .output()
        .map_err(|source| OcrError::Launch {
            program: program.clone(),
            source,
        })?;

    // tesseract 把版本打印到 stdout 或 stderr，视版本而定
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);

    Ok(combined
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown")
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_build_command() {
        let engine = TesseractEngine::new(OcrConfig {
            install_path: Some("/opt/ocr".to_string()),
            tessdata_path: Some("/opt/ocr/tessdata".to_string()),
            ..Default::default()
        });
        let cmd = engine.build_command(
            Path::new("/data/archive/fax_0.png"),
            Path::new("/data/analysis/fax_0"),
        );

        assert_eq!(
            cmd.args,
            vec!["/data/archive/fax_0.png", "/data/analysis/fax_0", "-l", "deu"]
        );
        assert_eq!(cmd.output, PathBuf::from("/data/analysis/fax_0.txt"));
        assert_eq!(cmd.working_dir, Some(PathBuf::from("/opt/ocr")));
        assert_eq!(
            cmd.envs,
            vec![("TESSDATA_PREFIX".to_string(), "/opt/ocr/tessdata".to_string())]
        );
    }

    #[test]
    fn test_psm_argument() {
        let engine = TesseractEngine::new(OcrConfig {
            psm: Some(6),
            language: Some("deu+eng".to_string()),
            ..Default::default()
        });
        let cmd = engine.build_command(Path::new("a.png"), Path::new("a"));
        assert_eq!(cmd.args[2..], ["-l", "deu+eng", "--psm", "6"]);
        assert_eq!(cmd.working_dir, None);
    }
}
