//! LLM 层：Model Runner 抽象与实现（OpenAI 兼容 / Mock）

pub mod error;
pub mod mock;
pub mod openai;
pub mod traits;

pub use error::RunnerError;
pub use mock::MockRunner;
pub use openai::OpenAiRunner;
pub use traits::{ModelEvent, ModelEventStream, ModelRunner};
