//! 传真接入循环
//!
//! 每一轮扫描输入目录，对每个文件依次执行：
//! 移动到归档目录（带重试） -> 拆页 -> 逐页 OCR -> 文本规范化 -> 过滤
//! -> 解析 -> 分配编号与补全时间 -> 派发任务。
//! 单个文件的任何失败只记录日志，循环继续处理下一个文件。

mod archive;
mod filter;

pub use archive::{archive_stem, archive_target, move_file, move_with_retry, RetryPolicy};
pub use filter::{FaxFilter, Verdict};

use alarm_core::{CancellationToken, CoreError, FaxParser, Operation, SequenceSource};
use alarm_ocr::{OcrEngine, OcrError};
use alarm_render::{split_pages, RenderError, RenderOptions};
use alarm_text::Normalizer;
use chrono::Local;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::config::FaxConfig;
use crate::dispatch::{DispatchReport, JobManager};
use crate::panic_message;

type Mover = Box<dyn FnMut(&Path, &Path) -> io::Result<()> + Send>;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("文件已不存在: {0}")]
    Vanished(PathBuf),
    #[error("移动 {path} 失败，已尝试 {attempts} 次: {source}")]
    MoveExhausted {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },
    #[error("拆页失败: {0}")]
    Split(#[from] RenderError),
    #[error("OCR 失败: {0}")]
    Ocr(#[from] OcrError),
    #[error("解析失败: {reason}")]
    Parse { reason: String, lines: Vec<String> },
    #[error("无法分配警情编号: {0}")]
    Sequence(#[source] CoreError),
    #[error("已取消")]
    Cancelled,
    #[error("IO 错误: {0}")]
    Io(#[from] io::Error),
}

/// 单个文件的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Dispatched { id: i64, report: DispatchReport },
    TestFax(String),
    Filtered(Verdict),
}

pub struct FaxSource {
    settings: FaxConfig,
    ocr: Box<dyn OcrEngine>,
    normalizer: Normalizer,
    parser: Box<dyn FaxParser>,
    jobs: JobManager,
    sequence: Box<dyn SequenceSource>,
    filter: FaxFilter,
    mover: Mover,
    /// 重试耗尽的文件，本次运行期间不再尝试
    abandoned: HashSet<PathBuf>,
}

impl FaxSource {
    pub fn new(
        settings: FaxConfig,
        ocr: Box<dyn OcrEngine>,
        normalizer: Normalizer,
        parser: Box<dyn FaxParser>,
        jobs: JobManager,
        sequence: Box<dyn SequenceSource>,
    ) -> Self {
        let filter = FaxFilter::from_config(&settings);
        Self {
            settings,
            ocr,
            normalizer,
            parser,
            jobs,
            sequence,
            filter,
            mover: Box::new(move_file),
            abandoned: HashSet::new(),
        }
    }

    /// 替换文件移动方式
    pub fn with_mover<F>(mut self, mover: F) -> Self
    where
        F: FnMut(&Path, &Path) -> io::Result<()> + Send + 'static,
    {
        self.mover = Box::new(mover);
        self
    }

    pub fn settings(&self) -> &FaxConfig {
        &self.settings
    }

    /// 运行直到取消
    pub fn run(&mut self, cancel: &CancellationToken) {
        log::info!(
            "[Fax] 开始监视 {}（*.{}，间隔 {} ms）",
            self.settings.fax_path.display(),
            self.settings.file_extension,
            self.settings.routine_interval_ms
        );
        if let Err(err) = self.ensure_directories() {
            log::error!("[Fax] 无法创建工作目录: {}", err);
        }

        while !cancel.is_cancelled() {
            self.poll_once(cancel);
            if !cancel.sleep(self.settings.routine_interval()) {
                break;
            }
        }
        log::info!("[Fax] 接入循环已停止");
    }

    /// 扫描一次并处理找到的全部文件，返回处理的文件数
    pub fn poll_once(&mut self, cancel: &CancellationToken) -> usize {
        let files = match self.discover() {
            Ok(files) => files,
            Err(err) => {
                log::error!(
                    "[Fax] 无法读取输入目录 {}: {}",
                    self.settings.fax_path.display(),
                    err
                );
                return 0;
            }
        };
        if !files.is_empty() {
            log::info!("[Fax] 发现 {} 个新传真", files.len());
        }

        let mut handled = 0;
        for file in files {
            if cancel.is_cancelled() {
                break;
            }
            handled += 1;

            match self.process_file(&file, cancel) {
                Ok(FileOutcome::Dispatched { id, report }) => log::info!(
                    "[Fax] {} 已处理为警情 #{}（任务成功 {}，失败 {}）",
                    file.display(),
                    id,
                    report.succeeded.len(),
                    report.failed.len()
                ),
                Ok(FileOutcome::TestFax(keyword)) => log::info!(
                    "[Fax] {} 是测试传真（关键字 '{}'），不做派发",
                    file.display(),
                    keyword
                ),
                Ok(FileOutcome::Filtered(verdict)) => {
                    log::info!("[Fax] {} 被过滤: {:?}", file.display(), verdict)
                }
                Err(IngestError::Cancelled) => {
                    log::warn!("[Fax] 处理 {} 时收到停止信号", file.display());
                    break;
                }
                Err(IngestError::Parse { reason, lines }) => {
                    log::error!(
                        "[Fax] {} 解析失败: {}\n---- 原文 ----\n{}",
                        file.display(),
                        reason,
                        lines.join("\n")
                    );
                }
                Err(err) => log::error!("[Fax] 处理 {} 失败: {}", file.display(), err),
            }
        }
        handled
    }

    /// 处理单个输入文件
    pub fn process_file(
        &mut self,
        file: &Path,
        cancel: &CancellationToken,
    ) -> Result<FileOutcome, IngestError> {
        let archived = self.claim(file, cancel)?;
        log::info!("[Fax] {} 已归档为 {}", file.display(), archived.display());

        let raw = self.recognize(&archived, cancel)?;
        let lines = self.normalizer.normalize(&raw);

        match self.filter.check(&lines) {
            Verdict::Accept => {}
            Verdict::TestFax(keyword) => return Ok(FileOutcome::TestFax(keyword)),
            other => return Ok(FileOutcome::Filtered(other)),
        }

        let mut operation = self.parse(lines)?;
        self.enrich(&mut operation)?;

        let report = self.jobs.dispatch(&operation);
        Ok(FileOutcome::Dispatched {
            id: operation.id,
            report,
        })
    }

    fn ensure_directories(&self) -> io::Result<()> {
        for dir in [
            &self.settings.fax_path,
            &self.settings.archive_path,
            &self.settings.analysis_path,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// 输入目录中待处理的文件，按文件名排序
    fn discover(&self) -> io::Result<Vec<PathBuf>> {
        let extension = self.settings.file_extension.trim_start_matches('.');
        let settle = self.settings.settle();
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.settings.fax_path)? {
            let entry = entry?;
            let path = entry.path();
            let metadata = entry.metadata()?;

            if !metadata.is_file() || self.abandoned.contains(&path) {
                continue;
            }
            let matches_extension = path
                .extension()
                .map_or(false, |ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
            if !matches_extension {
                continue;
            }

            // 发送方刚写完的文件留到下一轮
            if !settle.is_zero() {
                let age = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| SystemTime::now().duration_since(modified).ok());
                if age.map_or(false, |age| age < settle) {
                    continue;
                }
            }
            files.push(path);
        }

        files.sort();
        Ok(files)
    }

    fn claim(&mut self, file: &Path, cancel: &CancellationToken) -> Result<PathBuf, IngestError> {
        fs::create_dir_all(&self.settings.archive_path)?;
        let target = archive_target(
            &self.settings.archive_path,
            Local::now(),
            &self.settings.file_extension,
        );
        let policy = RetryPolicy {
            attempts: self.settings.move_retry_count,
            delay: self.settings.move_retry_delay(),
        };

        let result = move_with_retry(file, &target, policy, cancel, &mut self.mover);
        if let Err(IngestError::MoveExhausted { .. }) = &result {
            log::warn!("[Fax] 放弃 {}，本次运行不再尝试", file.display());
            self.abandoned.insert(file.to_path_buf());
        }
        result.map(|()| target)
    }

    fn recognize(&self, archived: &Path, cancel: &CancellationToken) -> Result<Vec<String>, IngestError> {
        fs::create_dir_all(&self.settings.analysis_path)?;
        let stem = archived
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut lines = Vec::new();
        for (index, page) in split_pages(archived, &RenderOptions::default())?.enumerate() {
            let page = page?;
            let output_base = self
                .settings
                .analysis_path
                .join(format!("{}_{}", stem, index));

            let result = self.ocr.recognize(&page, &output_base, cancel);
            if !self.settings.keep_page_images {
                if let Err(err) = fs::remove_file(&page) {
                    log::debug!("[Fax] 无法删除页面图片 {}: {}", page.display(), err);
                }
            }

            match result {
                Ok(page_lines) => lines.extend(page_lines),
                Err(OcrError::Cancelled) => return Err(IngestError::Cancelled),
                Err(err) => return Err(err.into()),
            }
        }
        log::debug!("[Fax] {} 识别出 {} 行", archived.display(), lines.len());
        Ok(lines)
    }

    fn parse(&self, lines: Vec<String>) -> Result<Operation, IngestError> {
        let parser = &self.parser;
        let outcome = catch_unwind(AssertUnwindSafe(|| parser.parse(&lines)));
        let reason = match outcome {
            Ok(Ok(operation)) => return Ok(operation),
            Ok(Err(err)) => err.to_string(),
            Err(panic) => format!("解析器崩溃: {}", panic_message(panic.as_ref())),
        };
        Err(IngestError::Parse { reason, lines })
    }

    /// 分配编号，缺失的警情时间补为当前时间
    fn enrich(&mut self, operation: &mut Operation) -> Result<(), IngestError> {
        operation.id = self
            .sequence
            .next_operation_id()
            .map_err(IngestError::Sequence)?;

        if operation.timestamp.is_none() {
            log::warn!(
                "[Fax] 警情 #{} 未解析出时间，使用当前时间",
                operation.id
            );
            operation.timestamp = Some(Local::now());
        }
        Ok(())
    }
}
