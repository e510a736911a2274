//! Model Runner 错误分类
//!
//! 与 agent::classify 配合：每个变体对应一种恢复策略（限流退避、直接终止、瞬时重试等）。

use thiserror::Error;

/// Runner 调用或事件流消费过程中出现的错误（封闭枚举，供分类器查表）
#[derive(Error, Debug, Clone)]
pub enum RunnerError {
    /// 提供方限流；消息中可能带 "retry after N" 提示
    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("authentication error: {0}")]
    Authentication(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("context window exceeded: {0}")]
    ContextWindowExceeded(String),

    /// 服务端瞬时错误（5xx、过载、内部错误）
    #[error("service error: {0}")]
    Service(String),

    /// 未归类错误；kind 为底层错误类型名，便于诊断
    #[error("{kind}: {message}")]
    Other { kind: String, message: String },
}
