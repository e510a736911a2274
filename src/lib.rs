//! Mesa - 餐厅助手智能体
//!
//! 将自然语言的找餐厅请求交给托管 LLM 推理，按固定 Schema 校验模型返回的
//! 结构化 a2ui 载荷，失败时按类别决定重试、降级或终止。模块划分：
//! - **agent**: 编排循环、响应提取、Schema 校验、失败分类与事件类型
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **llm**: Model Runner 抽象与实现（OpenAI 兼容 / Mock）
//! - **observability**: tracing 日志初始化
//! - **prompt**: 系统提示词常量与拼装
//! - **session**: 内存会话存储（state bag 注入 base_url）

pub mod agent;
pub mod config;
pub mod llm;
pub mod observability;
pub mod prompt;
pub mod session;

pub use agent::{Agent, StreamEvent};
