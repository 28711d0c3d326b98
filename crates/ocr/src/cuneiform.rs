//! Cuneiform OCR 引擎实现（CLI 包装）
//!
//! 调用形式：`cuneiform -l ger --singlecolumn -o <outbase>.txt <image>`。

use std::path::Path;
use std::time::Duration;

use crate::engine::{with_suffix, OcrEngine};
use crate::process::OcrCommand;
use crate::types::{OcrConfig, OcrEngineType};

pub struct CuneiformEngine {
    config: OcrConfig,
}

impl CuneiformEngine {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }
}

impl OcrEngine for CuneiformEngine {
    fn engine_type(&self) -> OcrEngineType {
        OcrEngineType::Cuneiform
    }

    fn build_command(&self, image: &Path, output_base: &Path) -> OcrCommand {
        let output = with_suffix(output_base, ".txt");
        OcrCommand {
            program: self.config.binary(),
            args: vec![
                "-l".to_string(),
                self.config.language_or_default().to_string(),
                "--singlecolumn".to_string(),
                "-o".to_string(),
                output.display().to_string(),
                image.display().to_string(),
            ],
            envs: Vec::new(),
            working_dir: self.config.working_dir(),
            output,
            stderr_log: with_suffix(output_base, ".stderr.log"),
        }
    }

    fn timeout(&self) -> Duration {
        self.config.timeout()
    }
}
