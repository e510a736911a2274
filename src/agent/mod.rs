//! 餐厅助手 Agent：校验与重试编排
//!
//! 对外入口 stream(query, session_id)：返回事件接收端，若干 Progress 后
//! 恰好一个 Terminal；所有 Runner 异常在尝试边界被分类吸收，绝不向调用方
//! 抛出。子模块：events（事件类型）、extract（载荷提取）、schema（校验）、
//! classify（失败分类）、loop_（状态机）。

pub mod classify;
pub mod events;
pub mod extract;
pub mod loop_;
pub mod schema;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::config::{AppConfig, RetrySection};
use crate::llm::ModelRunner;
use crate::session::SessionStore;

pub use events::StreamEvent;
pub use extract::{extract_ui_payload, ExtractError, A2UI_DELIMITER};
pub use schema::{SchemaError, UiSchema};

/// 远端调用统一使用的 user_id
pub(crate) const REMOTE_USER_ID: &str = "remote_agent";

/// 餐厅助手 Agent：持有 Runner、会话存储、预编译 Schema 与重试参数
#[derive(Clone)]
pub struct Agent {
    pub(crate) use_ui: bool,
    pub(crate) base_url: String,
    pub(crate) retry: RetrySection,
    pub(crate) runner: Arc<dyn ModelRunner>,
    pub(crate) sessions: Arc<SessionStore>,
    /// None 表示 Schema 编译失败，UI 模式将永久不可用（构造时软失败并记日志）
    pub(crate) schema: Option<Arc<UiSchema>>,
}

impl Agent {
    pub fn new(cfg: &AppConfig, runner: Arc<dyn ModelRunner>) -> Self {
        let schema = match UiSchema::load() {
            Ok(s) => Some(Arc::new(s)),
            Err(e) => {
                error!("failed to load a2ui schema, UI validation disabled: {e}");
                None
            }
        };
        Self::with_schema(cfg, runner, schema)
    }

    /// 以显式 Schema 状态构建；None 表示 Schema 不可用（测试覆盖该降级路径）
    #[doc(hidden)]
    pub fn with_schema(
        cfg: &AppConfig,
        runner: Arc<dyn ModelRunner>,
        schema: Option<Arc<UiSchema>>,
    ) -> Self {
        Self {
            use_ui: cfg.app.use_ui,
            base_url: cfg.app.base_url.clone(),
            retry: cfg.retry.clone(),
            runner,
            sessions: Arc::new(SessionStore::new(cfg.app.name.clone())),
            schema,
        }
    }

    /// 中间事件透出给调用方的固定进度文案
    pub fn processing_message(&self) -> &'static str {
        "Finding restaurants that match your criteria..."
    }

    /// 处理一条用户请求：返回事件接收端（若干 Progress + 恰一个 Terminal）
    pub fn stream(
        &self,
        query: impl Into<String>,
        session_id: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<StreamEvent> {
        self.stream_with_cancel(query, session_id).0
    }

    /// 同 stream，另返回取消令牌；取消会中断退避等待并以终止文案收尾
    pub fn stream_with_cancel(
        &self,
        query: impl Into<String>,
        session_id: impl Into<String>,
    ) -> (mpsc::UnboundedReceiver<StreamEvent>, CancellationToken) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let agent = self.clone();
        let query = query.into();
        let session_id = session_id.into();
        let token = cancel.clone();
        tokio::spawn(async move {
            loop_::stream_loop(&agent, &query, &session_id, &tx, token).await;
        });

        (rx, cancel)
    }
}
