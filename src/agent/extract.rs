//! 响应提取：从模型最终文本中切出 a2ui JSON 载荷
//!
//! 约定：自由文本与 JSON 数组以字面分隔符 `---a2ui_JSON---` 分开，
//! 载荷可被 ```json 代码块包裹。

use serde_json::Value;
use thiserror::Error;

/// 自由文本与 a2ui JSON 载荷之间的字面分隔符
pub const A2UI_DELIMITER: &str = "---a2ui_JSON---";

/// 提取失败的原因（用于拼接纠错重试提示）
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("delimiter '---a2ui_JSON---' not found")]
    MissingDelimiter,

    #[error("JSON part is empty")]
    EmptyPayload,

    #[error("payload is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// 按分隔符切分最终文本，剥掉可选的 ```json 围栏后解析 JSON
///
/// 成功时返回 (前导自由文本, 解析后的载荷)；前导文本保留给需要富文本
/// 回复的调用方，当前编排循环在校验通过后仍回传完整原文。
pub fn extract_ui_payload(text: &str) -> Result<(String, Value), ExtractError> {
    let Some((prefix, payload)) = text.split_once(A2UI_DELIMITER) else {
        return Err(ExtractError::MissingDelimiter);
    };

    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ExtractError::EmptyPayload);
    }

    let payload = payload
        .strip_prefix("```json")
        .or_else(|| payload.strip_prefix("```"))
        .unwrap_or(payload);
    let payload = payload.strip_suffix("```").unwrap_or(payload);
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(ExtractError::EmptyPayload);
    }

    let value: Value = serde_json::from_str(payload)?;
    Ok((prefix.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_payload() {
        let text = "Here are some options\n---a2ui_JSON---\n[{\"deleteSurface\": {\"surfaceId\": \"s1\"}}]";
        let (prefix, value) = extract_ui_payload(text).unwrap();
        assert_eq!(prefix, "Here are some options\n");
        assert_eq!(value, json!([{"deleteSurface": {"surfaceId": "s1"}}]));
    }

    #[test]
    fn test_extract_fenced_payload() {
        let text = "Intro\n---a2ui_JSON---\n```json\n[{\"deleteSurface\": {\"surfaceId\": \"s1\"}}]\n```";
        let (_, value) = extract_ui_payload(text).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn test_missing_delimiter() {
        let err = extract_ui_payload("just some text").unwrap_err();
        assert!(matches!(err, ExtractError::MissingDelimiter));
    }

    #[test]
    fn test_empty_payload() {
        let err = extract_ui_payload("Intro\n---a2ui_JSON---\n   \n").unwrap_err();
        assert!(matches!(err, ExtractError::EmptyPayload));
    }

    #[test]
    fn test_fence_only_payload() {
        let err = extract_ui_payload("Intro\n---a2ui_JSON---\n```json\n```").unwrap_err();
        assert!(matches!(err, ExtractError::EmptyPayload));
    }

    #[test]
    fn test_invalid_json_payload() {
        let err = extract_ui_payload("Intro\n---a2ui_JSON---\n[{not json").unwrap_err();
        assert!(matches!(err, ExtractError::Parse(_)));
    }
}
