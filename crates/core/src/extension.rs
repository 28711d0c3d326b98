//! 扩展点接口定义
//!
//! 解析器与任务（Job）通过 [`crate::ExportRegistry`] 按别名注册，
//! 接入流程在启动时解析出具体实现，之后只通过这些 trait 调用。

use crate::operation::Operation;
use crate::Result;

/// 传真文本解析器
///
/// 输入为经过 OCR 与文本规范化后的行，输出一份尚未分配编号的 [`Operation`]。
pub trait FaxParser: Send {
    /// 解析文本行
    ///
    /// # 返回
    /// - 成功：填充后的 Operation（`id` 为 0）
    /// - 失败：语法不匹配或结构异常，调用方不会派发任何部分结果
    fn parse(&self, lines: &[String]) -> Result<Operation>;
}

/// 下游任务（通知、归档等）
pub trait Job: Send {
    /// 派发器构建时调用一次，失败的任务不会参与后续派发
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// 处理一份警情
    fn execute(&mut self, operation: &Operation) -> Result<()>;
}

/// 警情编号分配器
pub trait SequenceSource: Send {
    fn next_operation_id(&mut self) -> Result<i64>;
}
