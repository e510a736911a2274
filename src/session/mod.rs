//! 会话存储
//!
//! 内存实现：按 (user_id, session_id) 管理会话与其 state bag；首次使用时创建，
//! 复用时可注入缺失的键（如 base_url）。生命周期由存储持有，不显式销毁。

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::RwLock;

/// 单个会话：标识与 state bag（字符串键到 JSON 值）
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub state: HashMap<String, Value>,
    pub created_at: Instant,
}

impl Session {
    fn new(user_id: &str, session_id: &str, state: HashMap<String, Value>) -> Self {
        Self {
            id: session_id.to_string(),
            user_id: user_id.to_string(),
            state,
            created_at: Instant::now(),
        }
    }
}

/// 会话存储：应用维度，按 (user_id, session_id) 索引
pub struct SessionStore {
    app_name: String,
    sessions: RwLock<HashMap<(String, String), Session>>,
}

impl SessionStore {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// 获取会话（克隆快照）
    pub async fn get(&self, user_id: &str, session_id: &str) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(&(user_id.to_string(), session_id.to_string()))
            .cloned()
    }

    /// 创建会话并返回快照；同键已存在时覆盖
    pub async fn create(
        &self,
        user_id: &str,
        session_id: &str,
        state: HashMap<String, Value>,
    ) -> Session {
        let session = Session::new(user_id, session_id, state);
        self.sessions.write().await.insert(
            (user_id.to_string(), session_id.to_string()),
            session.clone(),
        );
        session
    }

    /// 原地修改会话（如向 state bag 注入缺失键）
    pub async fn with_session<F, R>(&self, user_id: &str, session_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(&(user_id.to_string(), session_id.to_string()))
            .map(f)
    }

    /// 活跃会话数
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = SessionStore::new("restaurant_agent");
        assert!(store.get("u1", "s1").await.is_none());

        let mut state = HashMap::new();
        state.insert("base_url".to_string(), json!("http://localhost:10001"));
        store.create("u1", "s1", state).await;

        let session = store.get("u1", "s1").await.unwrap();
        assert_eq!(session.id, "s1");
        assert_eq!(session.state["base_url"], json!("http://localhost:10001"));
        assert_eq!(store.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_inject_missing_state_key() {
        let store = SessionStore::new("restaurant_agent");
        store.create("u1", "s1", HashMap::new()).await;

        store
            .with_session("u1", "s1", |s| {
                s.state
                    .entry("base_url".to_string())
                    .or_insert(json!("http://localhost:10001"));
            })
            .await
            .unwrap();

        let session = store.get("u1", "s1").await.unwrap();
        assert_eq!(session.state["base_url"], json!("http://localhost:10001"));
    }

    #[tokio::test]
    async fn test_sessions_keyed_per_user() {
        let store = SessionStore::new("restaurant_agent");
        store.create("u1", "s1", HashMap::new()).await;
        store.create("u2", "s1", HashMap::new()).await;
        assert_eq!(store.active_count().await, 2);
        assert!(store.get("u3", "s1").await.is_none());
    }
}
