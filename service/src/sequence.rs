//! 文件持久化的警情编号

use alarm_core::{CoreError, SequenceSource};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// 在一个文本文件中保存最后分配的编号，首个编号为 1
pub struct FileSequence {
    path: PathBuf,
}

impl FileSequence {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn last_issued(&self) -> alarm_core::Result<i64> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(0),
            Ok(raw) => raw.trim().parse::<i64>().map_err(|err| {
                CoreError::Sequence(format!("{}: '{}' ({})", self.path.display(), raw.trim(), err))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}

impl SequenceSource for FileSequence {
    fn next_operation_id(&mut self) -> alarm_core::Result<i64> {
        let next = self.last_issued()? + 1;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        // 先写临时文件再替换，避免中途退出留下半个数字
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, next.to_string())?;
        fs::rename(&staging, &self.path)?;

        log::debug!("[Sequence] 分配警情编号 {}", next);
        Ok(next)
    }
}
