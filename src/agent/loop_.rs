//! 编排主循环
//!
//! 会话准备 -> 消费 Runner 事件流（首个 Final 即止）-> 失败分类 ->
//! 限流/瞬时错误退避、内容失败改写提问重试、或终止。限流重试独立计数，
//! 不消耗内容尝试；内容尝试上限为 max_content_retries + 1。
//! 退避等待以 CancellationToken 竞速，可被调用方中断。

use std::collections::HashMap;

use futures_util::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::agent::classify::{classify_runner_error, FailureAction};
use crate::agent::extract::extract_ui_payload;
use crate::agent::{Agent, StreamEvent, REMOTE_USER_ID};
use crate::llm::{ModelEvent, RunnerError};

/// Schema 未加载时的终止文案（UI 模式的前置条件）
pub const MSG_CONFIG_ERROR: &str = "I'm sorry, I'm facing an internal configuration error with my UI components. Please contact support.";

/// 重试耗尽仍无任何回复时的兜底文案
pub const MSG_GENERIC_FAILURE: &str =
    "I'm sorry, I encountered an error and couldn't process your request.";

/// UI 校验重试耗尽后的终止文案
pub const MSG_UI_FAILURE: &str = "I'm sorry, I'm having trouble generating the interface for that request right now. Please try again in a moment.";

/// 调用方取消后的终止文案
pub const MSG_CANCELLED: &str = "The request was cancelled.";

/// 失败内容写日志时的预览长度
const FAILED_CONTENT_PREVIEW_CHARS: usize = 500;

/// 跨迭代的循环状态：内容尝试数、限流重试数、当前（可能已改写的）提问
struct AttemptState {
    attempt: usize,
    rate_limit_retries: usize,
    current_query: String,
}

fn send(tx: &mpsc::UnboundedSender<StreamEvent>, ev: StreamEvent) {
    let _ = tx.send(ev);
}

/// 无回复时的纠错提问；原始请求原文保留
fn no_response_retry_prompt(original: &str) -> String {
    format!(
        "I received no response. Please try again. Please retry the original request: '{}'",
        original
    )
}

/// 校验失败时的纠错提问：带失败原因与格式约定，原始请求原文保留
fn validation_retry_prompt(error: &str, original: &str) -> String {
    format!(
        "Your previous response was invalid. Validation failed: {}. \
         You MUST generate a valid response that strictly follows the A2UI JSON SCHEMA. \
         The response MUST be a JSON list of A2UI messages. \
         Ensure the response is split by '---a2ui_JSON---' and the JSON part is well-formed. \
         Please retry the original request: '{}'",
        error, original
    )
}

/// 退避等待；取消时返回 false
async fn backoff(delay: std::time::Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(delay) => true,
    }
}

/// 执行一次 stream 调用的完整状态机；恰好发送一个 Terminal 事件
pub(crate) async fn stream_loop(
    agent: &Agent,
    query: &str,
    session_id: &str,
    event_tx: &mpsc::UnboundedSender<StreamEvent>,
    cancel: CancellationToken,
) {
    // 前置条件：UI 模式要求 Schema 已编译，否则直接终止
    if agent.use_ui && agent.schema.is_none() {
        error!(session_id, "a2ui schema is not loaded, cannot validate UI output");
        send(event_tx, StreamEvent::Terminal {
            content: MSG_CONFIG_ERROR.to_string(),
        });
        return;
    }

    // 会话准备：首次创建带 base_url 的 state bag，复用时注入缺失键
    match agent.sessions.get(REMOTE_USER_ID, session_id).await {
        Some(session) => {
            if !session.state.contains_key("base_url") {
                agent
                    .sessions
                    .with_session(REMOTE_USER_ID, session_id, |s| {
                        s.state
                            .insert("base_url".to_string(), json!(agent.base_url.clone()));
                    })
                    .await;
            }
        }
        None => {
            let mut state = HashMap::new();
            state.insert("base_url".to_string(), json!(agent.base_url.clone()));
            agent.sessions.create(REMOTE_USER_ID, session_id, state).await;
        }
    }

    let max_retries = agent.retry.max_content_retries;
    let mut state = AttemptState {
        attempt: 0,
        rate_limit_retries: 0,
        current_query: query.to_string(),
    };

    loop {
        state.attempt += 1;
        info!(
            session_id,
            attempt = state.attempt,
            total = max_retries + 1,
            "starting content attempt"
        );

        if cancel.is_cancelled() {
            send(event_tx, StreamEvent::Terminal {
                content: MSG_CANCELLED.to_string(),
            });
            return;
        }

        // 消费事件流：首个 Final 即止，中间事件转为 Progress
        let mut final_text: Option<String> = None;
        let mut runner_err: Option<RunnerError> = None;

        match agent
            .runner
            .run(REMOTE_USER_ID, session_id, &state.current_query)
            .await
        {
            Ok(mut events) => loop {
                let item = tokio::select! {
                    _ = cancel.cancelled() => {
                        send(event_tx, StreamEvent::Terminal {
                            content: MSG_CANCELLED.to_string(),
                        });
                        return;
                    }
                    item = events.next() => item,
                };
                match item {
                    None => break,
                    Some(Ok(ModelEvent::Final { text })) => {
                        if !text.trim().is_empty() {
                            final_text = Some(text);
                        }
                        break;
                    }
                    Some(Ok(ModelEvent::Intermediate)) => {
                        send(event_tx, StreamEvent::Progress {
                            message: agent.processing_message().to_string(),
                        });
                    }
                    Some(Err(e)) => {
                        runner_err = Some(e);
                        break;
                    }
                }
            },
            Err(e) => runner_err = Some(e),
        }

        if let Some(err) = runner_err {
            warn!(session_id, attempt = state.attempt, %err, "runner attempt failed");
            match classify_runner_error(&err, state.attempt, state.rate_limit_retries, &agent.retry)
            {
                FailureAction::RateLimitWait { delay, progress } => {
                    state.rate_limit_retries += 1;
                    info!(
                        session_id,
                        rate_limit_retries = state.rate_limit_retries,
                        delay_secs = delay.as_secs(),
                        "rate limited, backing off"
                    );
                    send(event_tx, StreamEvent::Progress { message: progress });
                    if !backoff(delay, &cancel).await {
                        send(event_tx, StreamEvent::Terminal {
                            content: MSG_CANCELLED.to_string(),
                        });
                        return;
                    }
                    // 限流不消耗内容尝试
                    state.attempt -= 1;
                    continue;
                }
                FailureAction::ServiceRetry { delay, progress } => {
                    send(event_tx, StreamEvent::Progress { message: progress });
                    if !backoff(delay, &cancel).await {
                        send(event_tx, StreamEvent::Terminal {
                            content: MSG_CANCELLED.to_string(),
                        });
                        return;
                    }
                    continue;
                }
                FailureAction::Abort { content } => {
                    send(event_tx, StreamEvent::Terminal { content });
                    return;
                }
            }
        }

        // 本次调用成功，限流计数归零
        state.rate_limit_retries = 0;

        let final_content = match final_text {
            Some(text) => text,
            None => {
                warn!(session_id, attempt = state.attempt, "runner produced no final response");
                if state.attempt <= max_retries {
                    state.current_query = no_response_retry_prompt(query);
                    continue;
                }
                // 重试耗尽：以兜底文案继续走校验（纯文本模式下直接通过）
                MSG_GENERIC_FAILURE.to_string()
            }
        };

        // UI 模式：提取 + 解析 + Schema 校验；纯文本模式任何非空文本都有效
        let mut validation_error: Option<String> = None;
        if agent.use_ui {
            if let Some(schema) = agent.schema.as_ref() {
                match extract_ui_payload(&final_content) {
                    Ok((_intro, payload)) => {
                        if let Err(e) = schema.validate(&payload) {
                            validation_error = Some(e);
                        }
                    }
                    Err(e) => validation_error = Some(e.to_string()),
                }
            }
        }

        match validation_error {
            None => {
                info!(session_id, attempt = state.attempt, "response valid, sending final content");
                send(event_tx, StreamEvent::Terminal {
                    content: final_content,
                });
                return;
            }
            Some(err) => {
                let preview: String = final_content
                    .chars()
                    .take(FAILED_CONTENT_PREVIEW_CHARS)
                    .collect();
                warn!(
                    session_id,
                    attempt = state.attempt,
                    error = %err,
                    preview = %preview,
                    "a2ui validation failed"
                );
                if state.attempt <= max_retries {
                    state.current_query = validation_retry_prompt(&err, query);
                    continue;
                }
                send(event_tx, StreamEvent::Terminal {
                    content: MSG_UI_FAILURE.to_string(),
                });
                return;
            }
        }
    }
}
