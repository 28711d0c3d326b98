//! OCR 子进程执行
//!
//! 以轮询 `try_wait` 的方式等待子进程，期间响应取消与超时，
//! 两种情况都会终止子进程而不是无限等待。stderr 写入日志文件，失败时回读其尾部。

use alarm_core::CancellationToken;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::OcrError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL: usize = 512;

/// 一次引擎调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    /// 引擎写出的文本文件
    pub output: PathBuf,
    /// stderr 日志文件
    pub stderr_log: PathBuf,
}

impl OcrCommand {
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// 运行命令直到退出
pub fn run(command: &OcrCommand, timeout: Duration, cancel: &CancellationToken) -> Result<(), OcrError> {
    if cancel.is_cancelled() {
        return Err(OcrError::Cancelled);
    }

    let stderr_file = File::create(&command.stderr_log)?;
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::from(stderr_file));
    for (key, value) in &command.envs {
        cmd.env(key, value);
    }
    if let Some(dir) = &command.working_dir {
        cmd.current_dir(dir);
    }

    log::info!("[Ocr] 执行: {}", command.command_line());

    let mut child = cmd.spawn().map_err(|source| OcrError::Launch {
        program: command.program.clone(),
        source,
    })?;

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                log::debug!(
                    "[Ocr] 完成，耗时: {} ms",
                    started.elapsed().as_millis()
                );
                let _ = fs::remove_file(&command.stderr_log);
                return Ok(());
            }
            return Err(OcrError::Failed {
                code: status.code(),
                stderr: read_tail(&command.stderr_log),
            });
        }

        if started.elapsed() >= timeout {
            terminate(&mut child);
            return Err(OcrError::Timeout(timeout));
        }
        if !cancel.sleep(POLL_INTERVAL) {
            terminate(&mut child);
            return Err(OcrError::Cancelled);
        }
    }
}

fn terminate(child: &mut Child) {
    if let Err(err) = child.kill() {
        log::warn!("[Ocr] 终止子进程失败: {}", err);
    }
    let _ = child.wait();
}

fn read_tail(path: &std::path::Path) -> String {
    let raw = fs::read(path).unwrap_or_default();
    let text = String::from_utf8_lossy(&raw);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(index, _)| index)
        .unwrap_or(0);
    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(dir: &std::path::Path, program: &str, args: &[&str]) -> OcrCommand {
        OcrCommand {
            program: PathBuf::from(program),
            args: args.iter().map(|s| s.to_string()).collect(),
            envs: Vec::new(),
            working_dir: Some(dir.to_path_buf()),
            output: dir.join("out.txt"),
            stderr_log: dir.join("out.stderr.log"),
        }
    }

    #[test]
    fn test_missing_executable_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(dir.path(), "/nonexistent/ocr-engine", &[]);
        let err = run(&cmd, Duration::from_secs(5), &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, OcrError::Launch { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let cmd = command(dir.path(), "/nonexistent/ocr-engine", &[]);
        assert!(matches!(
            run(&cmd, Duration::from_secs(5), &token),
            Err(OcrError::Cancelled)
        ));
    }

    #[test]
    fn test_command_line() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(dir.path(), "tesseract", &["a.png", "out", "-l", "deu"]);
        assert_eq!(cmd.command_line(), "tesseract a.png out -l deu");
    }

    #[cfg(unix)]
    #[test]
    fn test_success_and_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let ok = command(dir.path(), "sh", &["-c", "exit 0"]);
        run(&ok, Duration::from_secs(10), &CancellationToken::new()).unwrap();
        assert!(!ok.stderr_log.exists());

        let failing = command(dir.path(), "sh", &["-c", "echo kaputt >&2; exit 3"]);
        match run(&failing, Duration::from_secs(10), &CancellationToken::new()) {
            Err(OcrError::Failed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "kaputt");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(dir.path(), "sleep", &["30"]);
        let started = Instant::now();
        let err = run(&cmd, Duration::from_millis(200), &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = command(dir.path(), "sleep", &["30"]);
        let token = CancellationToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });

        let started = Instant::now();
        let err = run(&cmd, Duration::from_secs(60), &token).unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, OcrError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
