//! 系统提示词：餐厅助手的行为约定与 a2ui 输出契约
//!
//! 提示词内容本身不参与校验逻辑；此处只提供拼装入口，供 Runner 适配器
//! 作为 system 消息下发。

use crate::agent::A2UI_DELIMITER;

/// 餐厅助手的基础行为指令
pub const AGENT_INSTRUCTION: &str = "\
You are a helpful restaurant finding assistant. Your goal is to help users find and book restaurants using a rich UI.

To achieve this, you MUST follow this logic:

1.  **For finding restaurants:** extract the cuisine, location, and a specific number (`count`) of restaurants from the user's query (e.g., for \"top 5 chinese places\", count is 5), then generate the final a2ui UI JSON for the matching restaurants.

2.  **For booking a table** (when you receive a query like 'USER_WANTS_TO_BOOK...'): generate the booking UI, populating the `dataModelUpdate.contents` with the details from the user's query.

3.  **For confirming a booking** (when you receive a query like 'User submitted a booking...'): generate the confirmation UI, populating the `dataModelUpdate.contents` with the final booking details.
";

/// 纯文本模式的附加约定
pub const TEXT_INSTRUCTION: &str =
    "Answer in plain, friendly text. Do not emit any JSON or UI markup.";

/// UI 模式的附加约定：分隔符与数组载荷格式
fn ui_instruction(base_url: &str) -> String {
    format!(
        "After your short free-text summary, you MUST output the literal line '{delim}' \
         followed by a JSON array of a2ui messages (optionally inside a ```json fence). \
         Resolve all relative asset URLs against {base_url}.",
        delim = A2UI_DELIMITER,
        base_url = base_url
    )
}

/// 按模式拼装完整 system 提示词
pub fn build_system_prompt(use_ui: bool, base_url: &str) -> String {
    if use_ui {
        format!("{}\n{}", AGENT_INSTRUCTION, ui_instruction(base_url))
    } else {
        format!("{}\n{}", AGENT_INSTRUCTION, TEXT_INSTRUCTION)
    }
}
