//! 对调用方的流式事件：若干 Progress 后恰好一个 Terminal

use serde::Serialize;

/// 单次 stream 调用产出的事件（可序列化为 JSON 供前端展示）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// 中间进度（模型思考中、限流等待中等）
    Progress { message: String },
    /// 终态：成功回复或完整的致歉文案，此后不再有事件
    Terminal { content: String },
}
