//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MESA__*` 覆盖（双下划线表示嵌套，如 `MESA__APP__USE_UI=true`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            retry: RetrySection::default(),
        }
    }
}

/// [app] 段：应用名、前端资源 base_url、是否产出结构化 UI
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// 注入会话 state bag 的 base_url（UI 资源定位用）
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// true 时模型回复须携带 a2ui JSON 载荷并通过 Schema 校验；false 时任意非空文本即可
    #[serde(default)]
    pub use_ui: bool,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            base_url: default_base_url(),
            use_ui: false,
        }
    }
}

fn default_app_name() -> String {
    "restaurant_agent".to_string()
}

fn default_base_url() -> String {
    "http://localhost:10001".to_string()
}

/// [llm] 段：OpenAI 兼容端点与模型名；API Key 从环境变量 OPENAI_API_KEY 读取
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 可选：OpenAI 兼容 base_url（如 OpenRouter）；None 时用官方端点
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: None,
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "google/gemini-2.0-flash-exp:free".to_string()
}

/// [retry] 段：限流与内容失败的重试参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// 限流后默认等待秒数（错误消息带 "retry after N" 提示时以提示为准）
    #[serde(default = "default_rate_limit_delay_secs")]
    pub rate_limit_delay_secs: u64,
    /// 限流重试上限（独立计数，不消耗内容尝试次数）
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: usize,
    /// 服务端瞬时错误的重试等待秒数
    #[serde(default = "default_general_error_delay_secs")]
    pub general_error_delay_secs: u64,
    /// 内容失败（无回复 / 校验失败）的额外重试次数；1 表示共 2 次尝试
    #[serde(default = "default_max_content_retries")]
    pub max_content_retries: usize,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            rate_limit_delay_secs: default_rate_limit_delay_secs(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            general_error_delay_secs: default_general_error_delay_secs(),
            max_content_retries: default_max_content_retries(),
        }
    }
}

fn default_rate_limit_delay_secs() -> u64 {
    30
}

fn default_max_rate_limit_retries() -> usize {
    3
}

fn default_general_error_delay_secs() -> u64 {
    5
}

fn default_max_content_retries() -> usize {
    1
}

/// 从 config 目录加载配置，环境变量 MESA__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（可覆盖前面的键）；文件不存在直接报错
/// 3. 最后叠加环境变量 MESA__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    // 显式指定的配置文件必须存在，拼错路径不能静默落回默认值
    if let Some(ref path) = config_path {
        builder = builder.add_source(config::File::from(path.clone()).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MESA")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert!(!cfg.app.use_ui);
        assert_eq!(cfg.retry.rate_limit_delay_secs, 30);
        assert_eq!(cfg.retry.max_rate_limit_retries, 3);
        assert_eq!(cfg.retry.general_error_delay_secs, 5);
        assert_eq!(cfg.retry.max_content_retries, 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesa.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[app]\nuse_ui = true\nbase_url = \"http://ui.example:8080\"\n\n[retry]\nmax_content_retries = 2"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert!(cfg.app.use_ui);
        assert_eq!(cfg.app.base_url, "http://ui.example:8080");
        assert_eq!(cfg.retry.max_content_retries, 2);
        // 未覆盖的键保持默认
        assert_eq!(cfg.retry.rate_limit_delay_secs, 30);
    }

    #[test]
    fn test_missing_explicit_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_file.toml");
        assert!(load_config(Some(path)).is_err());
    }
}
