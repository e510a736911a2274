//! Mesa - 餐厅助手智能体
//!
//! 入口：初始化日志与配置，构建 OpenAI Runner 与 Agent，
//! 从标准输入逐行读取请求并打印事件流。

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use mesa::agent::{Agent, StreamEvent};
use mesa::config::load_config;
use mesa::llm::OpenAiRunner;
use mesa::observability;
use mesa::prompt::build_system_prompt;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let system_prompt = build_system_prompt(cfg.app.use_ui, &cfg.app.base_url);
    let runner = Arc::new(OpenAiRunner::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        None,
        system_prompt,
    ));
    let agent = Agent::new(&cfg, runner);

    // 单次进程一个会话
    let session_id = format!("session_{}", uuid::Uuid::new_v4());
    tracing::info!(%session_id, use_ui = cfg.app.use_ui, model = %cfg.llm.model, "mesa ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" || query == "quit" {
            break;
        }

        let mut rx = agent.stream(query, &session_id);
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Progress { message } => println!("... {message}"),
                StreamEvent::Terminal { content } => {
                    println!("{content}");
                    break;
                }
            }
        }
    }

    Ok(())
}
