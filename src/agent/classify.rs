//! 失败分类器
//!
//! 将一次尝试中 Runner 抛出的错误映射为动作：限流退避（独立计数，不消耗
//! 内容尝试）、瞬时服务错误退避重试（消耗内容尝试）、或带完整致歉文案的
//! 终止。优先级从最具体到最一般，与 RunnerError 变体一一对应。

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::config::RetrySection;
use crate::llm::RunnerError;

/// 限流重试耗尽后的终止文案
pub const MSG_RATE_LIMIT_EXHAUSTED: &str = "I apologize, but the AI service is currently experiencing very high demand and is temporarily rate-limited. Please try again in a few minutes. \n\nAlternatively, you can:\n1. Wait a few minutes and try again\n2. Check if your API provider has rate limit restrictions\n3. Consider using a different model in your configuration";

pub const MSG_CONNECTION: &str = "I'm sorry, I'm having trouble connecting to the AI service. Please check your internet connection and try again.";

pub const MSG_AUTHENTICATION: &str = "Authentication error: Please check your API key configuration. Make sure OPENAI_API_KEY is set correctly.";

pub const MSG_CONTEXT_WINDOW: &str = "I'm sorry, the conversation has become too long for the AI model to process. Please start a new conversation or try with a shorter query.";

pub const MSG_SERVICE: &str = "I'm sorry, the AI service is currently experiencing technical difficulties. Please try again in a few moments.";

/// 分类结果：编排循环据此决定下一步
#[derive(Debug, Clone, PartialEq)]
pub enum FailureAction {
    /// 限流等待后重试；不消耗内容尝试，循环需自行递增限流计数
    RateLimitWait { delay: Duration, progress: String },
    /// 瞬时服务错误，短暂等待后进入下一次内容尝试
    ServiceRetry { delay: Duration, progress: String },
    /// 终止，content 为完整的用户可见文案
    Abort { content: String },
}

/// 按优先级将 RunnerError 映射为动作
///
/// attempt 为当前尝试序号（从 1 起），rate_limit_retries 为已执行的限流重试数。
pub fn classify_runner_error(
    err: &RunnerError,
    attempt: usize,
    rate_limit_retries: usize,
    retry: &RetrySection,
) -> FailureAction {
    match err {
        RunnerError::RateLimited(message) => {
            if rate_limit_retries < retry.max_rate_limit_retries {
                let delay = retry_after_hint(message).unwrap_or(retry.rate_limit_delay_secs);
                FailureAction::RateLimitWait {
                    delay: Duration::from_secs(delay),
                    progress: format!(
                        "The AI service is currently experiencing high demand. Retrying in {} seconds... (Attempt {}/{})",
                        delay,
                        rate_limit_retries + 1,
                        retry.max_rate_limit_retries
                    ),
                }
            } else {
                FailureAction::Abort {
                    content: MSG_RATE_LIMIT_EXHAUSTED.to_string(),
                }
            }
        }
        RunnerError::Connection(_) => FailureAction::Abort {
            content: MSG_CONNECTION.to_string(),
        },
        RunnerError::Authentication(_) => FailureAction::Abort {
            content: MSG_AUTHENTICATION.to_string(),
        },
        RunnerError::InvalidRequest(message) => FailureAction::Abort {
            content: format!(
                "I'm sorry, there was an issue with the request. This might be due to an invalid model configuration or request parameters. Error: {}",
                message
            ),
        },
        RunnerError::ContextWindowExceeded(_) => FailureAction::Abort {
            content: MSG_CONTEXT_WINDOW.to_string(),
        },
        RunnerError::Service(_) => {
            if attempt <= retry.max_content_retries {
                FailureAction::ServiceRetry {
                    delay: Duration::from_secs(retry.general_error_delay_secs),
                    progress: format!(
                        "The AI service encountered a temporary error. Retrying in {} seconds...",
                        retry.general_error_delay_secs
                    ),
                }
            } else {
                FailureAction::Abort {
                    content: MSG_SERVICE.to_string(),
                }
            }
        }
        RunnerError::Other { kind, .. } => FailureAction::Abort {
            content: format!(
                "I'm sorry, an unexpected error occurred: {}. Please try again or contact support if the issue persists.",
                kind
            ),
        },
    }
}

/// 从限流错误消息中尽力解析 "retry after N" 的秒数提示
///
/// 解析失败不影响主分类路径，调用方回退到配置的默认等待。
fn retry_after_hint(message: &str) -> Option<u64> {
    if !message.to_lowercase().contains("retry after") {
        return None;
    }
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)retry.*?(\d+)").expect("static regex"));
    re.captures(message)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
