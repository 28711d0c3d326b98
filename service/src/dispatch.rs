//! 任务派发
//!
//! 每份警情按配置顺序交给全部已初始化的任务。任一任务返回错误或 panic
//! 只记录一次日志，不影响其余任务，也不影响接入循环。

use alarm_core::{ExportRegistry, Job, Operation};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::panic_message;

struct JobEntry {
    alias: String,
    job: Box<dyn Job>,
}

/// 单次派发结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

pub struct JobManager {
    jobs: Vec<JobEntry>,
}

impl JobManager {
    /// 按别名从注册表创建任务并初始化
    ///
    /// 未注册、创建失败或初始化失败的任务记录警告后跳过。
    pub fn from_registry(registry: &ExportRegistry, enabled: &[String]) -> Self {
        let mut jobs = Vec::with_capacity(enabled.len());
        for alias in enabled {
            match registry.resolve_named::<dyn Job>(alias) {
                Ok(Some(job)) => jobs.push((alias.clone(), job)),
                Ok(None) => log::warn!("[Jobs] 任务 '{}' 未注册，已忽略", alias),
                Err(err) => log::warn!("[Jobs] 任务 '{}' 创建失败，已忽略: {}", alias, err),
            }
        }
        Self::new(jobs)
    }

    pub fn new(jobs: Vec<(String, Box<dyn Job>)>) -> Self {
        let jobs: Vec<JobEntry> = jobs
            .into_iter()
            .filter_map(|(alias, job)| initialize(alias, job))
            .collect();
        log::info!("[Jobs] 已启用 {} 个任务", jobs.len());
        Self { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn aliases(&self) -> Vec<&str> {
        self.jobs.iter().map(|entry| entry.alias.as_str()).collect()
    }

    pub fn dispatch(&mut self, operation: &Operation) -> DispatchReport {
        let mut report = DispatchReport::default();

        for entry in &mut self.jobs {
            let job = &mut entry.job;
            let outcome = catch_unwind(AssertUnwindSafe(|| job.execute(operation)));
            match outcome {
                Ok(Ok(())) => report.succeeded.push(entry.alias.clone()),
                Ok(Err(err)) => {
                    log::error!(
                        "[Jobs] 任务 '{}' 处理警情 #{} 失败: {}",
                        entry.alias,
                        operation.id,
                        err
                    );
                    report.failed.push(entry.alias.clone());
                }
                Err(panic) => {
                    log::error!(
                        "[Jobs] 任务 '{}' 处理警情 #{} 时崩溃: {}",
                        entry.alias,
                        operation.id,
                        panic_message(panic.as_ref())
                    );
                    report.failed.push(entry.alias.clone());
                }
            }
        }
        report
    }
}

fn initialize(alias: String, mut job: Box<dyn Job>) -> Option<JobEntry> {
    match catch_unwind(AssertUnwindSafe(|| job.initialize())) {
        Ok(Ok(())) => Some(JobEntry { alias, job }),
        Ok(Err(err)) => {
            log::warn!("[Jobs] 任务 '{}' 初始化失败，已禁用: {}", alias, err);
            None
        }
        Err(panic) => {
            log::warn!(
                "[Jobs] 任务 '{}' 初始化时崩溃，已禁用: {}",
                alias,
                panic_message(panic.as_ref())
            );
            None
        }
    }
}
