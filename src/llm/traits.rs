//! Model Runner 抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 ModelRunner：对一条用户消息返回
//! 惰性的 ModelEvent 流，首个 Final 事件终止本次消费。

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::llm::RunnerError;

/// Runner 产出的单个事件
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// 中间步骤（如工具调用中），内容不透出给调用方
    Intermediate,
    /// 最终回复的拼接文本
    Final { text: String },
}

/// Runner 事件流：每项可能是事件，也可能是消费途中抛出的错误
pub type ModelEventStream = Pin<Box<dyn Stream<Item = Result<ModelEvent, RunnerError>> + Send>>;

/// Model Runner trait：对 (user, session, message) 产出一条事件流
#[async_trait]
pub trait ModelRunner: Send + Sync {
    async fn run(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<ModelEventStream, RunnerError>;
}
