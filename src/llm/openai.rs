//! OpenAI 兼容 Model Runner
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；支持 OpenRouter、OpenAI、自建代理等。
//! 单次请求对应一条事件流：仅产出一个 Final 事件；错误按 RunnerError 分类后放入流或直接返回。

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures_util::stream;

use crate::llm::{ModelEvent, ModelEventStream, ModelRunner, RunnerError};

/// OpenAI 兼容 Runner：持有 Client、model 名与系统提示词
pub struct OpenAiRunner {
    client: Client<OpenAIConfig>,
    model: String,
    system_prompt: String,
}

impl OpenAiRunner {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        system_prompt: String,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            system_prompt,
        }
    }

    fn build_messages(&self, message: &str) -> Result<Vec<ChatCompletionRequestMessage>, RunnerError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(self.system_prompt.clone())
            .build()
            .map_err(classify_openai_error)?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(message.to_string())
            .build()
            .map_err(classify_openai_error)?;
        Ok(vec![
            ChatCompletionRequestMessage::System(system),
            ChatCompletionRequestMessage::User(user),
        ])
    }
}

#[async_trait]
impl ModelRunner for OpenAiRunner {
    async fn run(
        &self,
        _user_id: &str,
        _session_id: &str,
        message: &str,
    ) -> Result<ModelEventStream, RunnerError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.build_messages(message)?)
            .build()
            .map_err(classify_openai_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(Box::pin(stream::iter(vec![Ok(ModelEvent::Final { text })])))
    }
}

/// 将 OpenAIError 映射到 RunnerError 分类
///
/// ApiError 优先按 type/code 判定，其次按消息文本做启发式匹配；
/// Reqwest 归为连接错误，其余变体归为 Other 并保留类型名。
fn classify_openai_error(err: OpenAIError) -> RunnerError {
    match err {
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or("").to_ascii_lowercase();
            let message = api.message.clone();
            let lower = message.to_ascii_lowercase();

            if kind.contains("rate_limit")
                || kind == "insufficient_quota"
                || lower.contains("rate limit")
                || lower.contains("too many requests")
            {
                RunnerError::RateLimited(message)
            } else if kind.contains("authentication")
                || kind.contains("invalid_api_key")
                || lower.contains("api key")
                || lower.contains("unauthorized")
            {
                RunnerError::Authentication(message)
            } else if kind.contains("context_length")
                || lower.contains("context length")
                || lower.contains("maximum context")
            {
                RunnerError::ContextWindowExceeded(message)
            } else if kind.contains("invalid_request") {
                RunnerError::InvalidRequest(message)
            } else if kind.contains("server_error")
                || lower.contains("internal server error")
                || lower.contains("service unavailable")
                || lower.contains("overloaded")
            {
                RunnerError::Service(message)
            } else {
                RunnerError::Other {
                    kind: "api_error".to_string(),
                    message,
                }
            }
        }
        OpenAIError::Reqwest(e) => RunnerError::Connection(e.to_string()),
        other => RunnerError::Other {
            kind: "openai_error".to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    fn api_error(r#type: Option<&str>, message: &str) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: r#type.map(String::from),
            param: None,
            code: None,
        })
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = api_error(Some("rate_limit_exceeded"), "Too many requests");
        assert!(matches!(
            classify_openai_error(err),
            RunnerError::RateLimited(_)
        ));
    }

    #[test]
    fn test_classify_auth() {
        let err = api_error(Some("invalid_api_key"), "Incorrect API key provided");
        assert!(matches!(
            classify_openai_error(err),
            RunnerError::Authentication(_)
        ));
    }

    #[test]
    fn test_classify_context_length_from_message() {
        let err = api_error(
            Some("invalid_request_error"),
            "This model's maximum context length is 8192 tokens",
        );
        assert!(matches!(
            classify_openai_error(err),
            RunnerError::ContextWindowExceeded(_)
        ));
    }

    #[test]
    fn test_classify_server_error() {
        let err = api_error(Some("server_error"), "The server had an error");
        assert!(matches!(classify_openai_error(err), RunnerError::Service(_)));
    }

    #[test]
    fn test_classify_unknown_keeps_kind() {
        let err = api_error(None, "something odd");
        match classify_openai_error(err) {
            RunnerError::Other { kind, message } => {
                assert_eq!(kind, "api_error");
                assert_eq!(message, "something odd");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
