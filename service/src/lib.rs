//! 传真报警接入服务
//!
//! 组装各组件：配置 -> 导出表 -> 解析器 / 任务 / OCR / 规范化器 -> [`FaxSource`]，
//! 并在后台线程中运行接入循环。

pub mod config;
pub mod dispatch;
pub mod exports;
pub mod ingest;
pub mod jobs;
pub mod sequence;

pub use config::{load_config, save_config, AppConfig, ConfigError};
pub use dispatch::{DispatchReport, JobManager};
pub use ingest::{FaxSource, FileOutcome, IngestError};
pub use sequence::FileSequence;

use alarm_core::{CancellationToken, ExportRegistry, FaxParser};
use anyhow::Context;
use std::any::Any;
use std::io;
use std::thread::{self, JoinHandle};

/// 从 panic 负载中取出可读信息
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 按配置组装接入循环
///
/// 解析器无法创建时返回错误：没有解析器循环无法工作。
/// 任务的问题只记录警告。
pub fn build_source(config: &AppConfig, registry: &ExportRegistry) -> anyhow::Result<FaxSource> {
    let parser = registry
        .require::<dyn FaxParser>(&config.fax.parser_alias)
        .with_context(|| format!("无法创建解析器 '{}'", config.fax.parser_alias))?;
    let normalizer = config
        .replace_dictionary
        .compile()
        .context("替换表无效")?;
    let jobs = JobManager::from_registry(registry, &config.jobs.enabled);
    let ocr = alarm_ocr::create_engine(&config.ocr);
    let sequence = FileSequence::new(config.sequence.state_file.clone());

    log::info!(
        "[Service] 解析器 '{}'，OCR 引擎 {}，替换规则 {} 条，任务 {:?}",
        config.fax.parser_alias,
        ocr.engine_type(),
        normalizer.len(),
        jobs.aliases()
    );

    Ok(FaxSource::new(
        config.fax.clone(),
        ocr,
        normalizer,
        parser,
        jobs,
        Box::new(sequence),
    ))
}

/// 后台运行中的接入循环
pub struct ServiceHandle {
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl ServiceHandle {
    pub fn start(mut source: FaxSource) -> io::Result<Self> {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let worker = thread::Builder::new()
            .name("fax-ingest".to_string())
            .spawn(move || source.run(&token))?;
        Ok(Self { cancel, worker })
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 请求停止并等待当前步骤结束
    pub fn stop(self) {
        self.cancel.cancel();
        if self.worker.join().is_err() {
            log::error!("[Service] 接入线程异常退出");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_panic_message() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }

    #[test]
    fn test_build_source_requires_grammar() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("alarmfax.json")).unwrap();
        let registry = exports::build_registry(&config);
        assert!(build_source(&config, &registry).is_err());

        fs::write(&config.parser.control_file, r#"{"sections": []}"#).unwrap();
        assert!(build_source(&config, &registry).is_ok());
    }

    #[test]
    fn test_unknown_parser_alias_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load_config(&dir.path().join("alarmfax.json")).unwrap();
        fs::write(&config.parser.control_file, r#"{"sections": []}"#).unwrap();
        config.fax.parser_alias = "Nope".to_string();

        let registry = exports::build_registry(&config);
        assert!(build_source(&config, &registry).is_err());
    }

    #[test]
    fn test_sample_configuration_builds() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/alarmfax.json");
        let config = load_config(&path).unwrap();
        assert_eq!(config.jobs.enabled.len(), 2);

        let registry = exports::build_registry(&config);
        let parser = registry
            .require::<dyn FaxParser>(&config.fax.parser_alias)
            .unwrap();
        let lines: Vec<String> = ["EINSATZ0RT", "Stra8e: Ring Haus-Nr.: 4", "0rt: 54321 Musterdorf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let normalized = config.replace_dictionary.compile().unwrap().normalize(&lines);
        let op = parser.parse(&normalized).unwrap();
        assert_eq!(op.location.street, "Ring");
        assert_eq!(op.location.street_number, "4");
        assert_eq!(op.location.zip_code, "54321");
        assert_eq!(op.location.city, "Musterdorf");
    }

    #[test]
    fn test_service_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = load_config(&dir.path().join("alarmfax.json")).unwrap();
        config.fax.routine_interval_ms = 10_000;
        fs::write(&config.parser.control_file, r#"{"sections": []}"#).unwrap();

        let registry = exports::build_registry(&config);
        let source = build_source(&config, &registry).unwrap();
        let handle = ServiceHandle::start(source).unwrap();
        assert!(!handle.token().is_cancelled());
        handle.stop();
        assert!(config.fax.fax_path.is_dir());
    }
}
