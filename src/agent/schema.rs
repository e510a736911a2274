//! a2ui 消息的 Schema 校验
//!
//! 单条消息的 JSON Schema 随二进制内嵌；模型被要求返回消息数组，
//! 因此加载时把单条 Schema 包成 `{"type": "array", "items": ...}` 再编译。
//! 编译一次，校验无副作用、无隐藏状态。

use jsonschema::JSONSchema;
use serde_json::{json, Value};
use thiserror::Error;

/// 单条 a2ui 消息的 Schema 文档
const A2UI_MESSAGE_SCHEMA: &str = include_str!("../../schema/a2ui_message.json");

/// Schema 加载失败：文档本身不是 JSON，或无法编译
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("schema failed to compile: {0}")]
    Compile(String),
}

/// 预编译的数组 Schema
pub struct UiSchema {
    compiled: JSONSchema,
}

impl UiSchema {
    /// 加载内嵌的单条消息 Schema 并包成数组 Schema
    pub fn load() -> Result<Self, SchemaError> {
        Self::from_document(A2UI_MESSAGE_SCHEMA)
    }

    /// 从给定文档构建（测试可注入坏文档验证软失败路径）
    pub fn from_document(doc: &str) -> Result<Self, SchemaError> {
        let single: Value = serde_json::from_str(doc)?;
        let wrapped = json!({ "type": "array", "items": single });
        let compiled = JSONSchema::compile(&wrapped)
            .map_err(|e| SchemaError::Compile(e.to_string()))?;
        Ok(Self { compiled })
    }

    /// 全量结构校验；失败时返回首个违规的可读描述
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        match self.compiled.validate(instance) {
            Ok(()) => Ok(()),
            Err(mut errors) => {
                let first = errors
                    .next()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "schema validation failed".to_string());
                Err(first)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> Value {
        json!([
            {
                "beginRendering": {
                    "surfaceId": "restaurants",
                    "root": { "componentId": "root" }
                }
            },
            {
                "dataModelUpdate": {
                    "surfaceId": "restaurants",
                    "path": "/results",
                    "contents": [{ "name": "Golden Dragon", "cuisine": "chinese" }]
                }
            }
        ])
    }

    #[test]
    fn test_valid_payload_passes() {
        let schema = UiSchema::load().unwrap();
        assert!(schema.validate(&valid_payload()).is_ok());
    }

    #[test]
    fn test_non_array_rejected() {
        let schema = UiSchema::load().unwrap();
        let instance = json!({ "deleteSurface": { "surfaceId": "s1" } });
        assert!(schema.validate(&instance).is_err());
    }

    #[test]
    fn test_unknown_message_kind_rejected() {
        let schema = UiSchema::load().unwrap();
        let instance = json!([{ "renderEverything": {} }]);
        let err = schema.validate(&instance).unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let schema = UiSchema::load().unwrap();
        let instance = json!([{ "beginRendering": { "surfaceId": "s1" } }]);
        assert!(schema.validate(&instance).is_err());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let schema = UiSchema::load().unwrap();
        let good = valid_payload();
        let bad = json!([{ "bogus": {} }]);
        assert_eq!(schema.validate(&good), schema.validate(&good));
        assert_eq!(schema.validate(&bad), schema.validate(&bad));
    }

    #[test]
    fn test_malformed_document_fails_soft() {
        assert!(matches!(
            UiSchema::from_document("{ not json"),
            Err(SchemaError::Parse(_))
        ));
    }
}
