//! Mock Model Runner（用于测试，无需 API）
//!
//! 按脚本逐次返回预设的事件序列或错误；脚本耗尽后回显用户消息，便于本地跑通流程。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream;

use crate::llm::{ModelEvent, ModelEventStream, ModelRunner, RunnerError};

/// 单次 run 调用的脚本
pub enum ScriptedTurn {
    /// 调用成功，事件流逐项产出（事件或流中错误）
    Events(Vec<Result<ModelEvent, RunnerError>>),
    /// 调用本身失败
    Fail(RunnerError),
}

/// Mock Runner：共享于测试的脚本化后端
#[derive(Default)]
pub struct MockRunner {
    script: Mutex<VecDeque<ScriptedTurn>>,
    /// 收到的消息记录（测试断言纠错提示用）
    messages: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次成功调用：单个 Final 事件
    pub fn push_final(&self, text: &str) {
        self.push_events(vec![Ok(ModelEvent::Final {
            text: text.to_string(),
        })]);
    }

    /// 追加一次成功调用：自定义事件序列
    pub fn push_events(&self, events: Vec<Result<ModelEvent, RunnerError>>) {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedTurn::Events(events));
    }

    /// 追加一次失败调用
    pub fn push_error(&self, err: RunnerError) {
        self.script.lock().unwrap().push_back(ScriptedTurn::Fail(err));
    }

    /// run 被调用的总次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// 已收到的用户消息（按调用顺序）
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelRunner for MockRunner {
    async fn run(
        &self,
        _user_id: &str,
        _session_id: &str,
        message: &str,
    ) -> Result<ModelEventStream, RunnerError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.messages.lock().unwrap().push(message.to_string());

        let turn = self.script.lock().unwrap().pop_front();
        match turn {
            Some(ScriptedTurn::Events(events)) => Ok(Box::pin(stream::iter(events))),
            Some(ScriptedTurn::Fail(err)) => Err(err),
            None => Ok(Box::pin(stream::iter(vec![Ok(ModelEvent::Final {
                text: format!("Echo from Mock: {}", message),
            })]))),
        }
    }
}
