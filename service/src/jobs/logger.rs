use alarm_core::{Job, Operation};

/// 把每份警情以一行摘要写入日志
#[derive(Debug, Default)]
pub struct OperationLogger;

impl Job for OperationLogger {
    fn execute(&mut self, operation: &Operation) -> alarm_core::Result<()> {
        log::info!("[Jobs] 新警情 {}", operation);
        if !operation.resources.is_empty() {
            log::info!(
                "[Jobs] 警情 #{} 出动力量: {}",
                operation.id,
                operation.resources.to_single_line()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_accepts_any_operation() {
        let mut job = OperationLogger;
        assert!(job.initialize().is_ok());
        assert!(job.execute(&Operation::new()).is_ok());
    }
}
