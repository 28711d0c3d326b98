//! 归档命名与带重试的移动

use alarm_core::CancellationToken;
use chrono::{DateTime, Local, Timelike};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::IngestError;

/// `yyyyMMddHHmmss` 加四位秒内小数
pub fn archive_stem(now: DateTime<Local>) -> String {
    let fraction = now.nanosecond() % 1_000_000_000 / 100_000;
    format!("{}{:04}", now.format("%Y%m%d%H%M%S"), fraction)
}

/// 归档目录中尚未占用的目标路径，冲突时追加 `_n`
pub fn archive_target(dir: &Path, now: DateTime<Local>, extension: &str) -> PathBuf {
    let stem = archive_stem(now);
    let extension = extension.trim_start_matches('.');

    let mut candidate = dir.join(format!("{}.{}", stem, extension));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}.{}", stem, counter, extension));
        counter += 1;
    }
    candidate
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

/// 默认的移动方式：先尝试重命名，跨设备时退化为复制后删除
pub fn move_file(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(err),
        Err(rename_err) => {
            log::debug!(
                "[Fax] 重命名 {} 失败（{}），改为复制",
                source.display(),
                rename_err
            );
            fs::copy(source, target)?;
            if let Err(err) = fs::remove_file(source) {
                // 原文件仍被占用时撤回副本，交给下一次重试
                let _ = fs::remove_file(target);
                return Err(err);
            }
            Ok(())
        }
    }
}

/// 移动文件，失败时按策略重试
///
/// 发送方可能仍在写入，传真文件在此期间无法移动。源文件消失视为已被他人取走，
/// 不再重试。等待期间取消会立即返回 [`IngestError::Cancelled`]。
pub fn move_with_retry<F>(
    source: &Path,
    target: &Path,
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut mover: F,
) -> Result<(), IngestError>
where
    F: FnMut(&Path, &Path) -> io::Result<()>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match mover(source, target) {
            Ok(()) => {
                if attempt > 1 {
                    log::info!(
                        "[Fax] 第 {} 次尝试移动 {} 成功",
                        attempt,
                        source.display()
                    );
                }
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(IngestError::Vanished(source.to_path_buf()));
            }
            Err(err) => {
                log::warn!(
                    "[Fax] 移动 {} 失败（{}/{}）: {}",
                    source.display(),
                    attempt,
                    attempts,
                    err
                );
                last_error = Some(err);
            }
        }

        if attempt < attempts && !cancel.sleep(policy.delay) {
            return Err(IngestError::Cancelled);
        }
    }

    Err(IngestError::MoveExhausted {
        path: source.to_path_buf(),
        attempts,
        source: last_error.unwrap_or_else(|| io::Error::new(ErrorKind::Other, "move failed")),
    })
}
