use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Channel;

/// 目录 / 配置错误（启动期致命错误）
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("duplicate intent id: {0}")]
    DuplicateIntent(String),
    #[error("catalog entry #{index} has an empty intent id")]
    EmptyIntentId { index: usize },
    #[error("intent {intent_id} has an empty target")]
    EmptyTarget { intent_id: String },
    #[error("intent {intent_id} has min_confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { intent_id: String, value: f64 },
    #[error("intent {intent_id} is {channel}-eligible but has no {what}")]
    MissingTriggers {
        intent_id: String,
        channel: Channel,
        what: &'static str,
    },
    #[error("intent {intent_id} has a blank {what}")]
    BlankTrigger { intent_id: String, what: &'static str },
    #[error("gesture label {label} is mapped by both {first} and {second}")]
    DuplicateGestureLabel {
        label: String,
        first: String,
        second: String,
    },
    #[error("unknown channel {channel} in intent {intent_id}")]
    UnknownChannel { intent_id: String, channel: String },
}

/// 规范化失败：没有匹配的触发词 / 手势映射
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnrecognizedInputError {
    #[error("voice transcript matched no trigger phrase: {transcript:?}")]
    NoTriggerMatch { transcript: String },
    #[error("gesture label is not mapped: {label}")]
    UnmappedGesture { label: String },
    #[error("gesture {label} confidence {confidence} below {min_confidence} for {intent_id}")]
    GestureBelowThreshold {
        label: String,
        intent_id: String,
        confidence: f64,
        min_confidence: f64,
    },
    #[error("ui event carries an empty intent id")]
    EmptyUiIntent,
}

/// 路由器拒绝原因（可恢复，返回给通道适配器）
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("unknown intent: {intent_id}")]
    UnknownIntent { intent_id: String },
    #[error("confidence {confidence} below {min_confidence} for {intent_id}")]
    LowConfidence {
        intent_id: String,
        confidence: f64,
        min_confidence: f64,
    },
    #[error("{intent_id} from {channel} is cooling down ({remaining_ms} ms left)")]
    Cooldown {
        intent_id: String,
        channel: Channel,
        remaining_ms: u64,
    },
    #[error("channel {channel} is disabled")]
    ChannelDisabled { channel: Channel },
}

impl Rejection {
    /// 稳定的原因代码，用于日志和指标标签
    pub fn reason_code(&self) -> &'static str {
        match self {
            Rejection::UnknownIntent { .. } => "unknown_intent",
            Rejection::LowConfidence { .. } => "low_confidence",
            Rejection::Cooldown { .. } => "cooldown",
            Rejection::ChannelDisabled { .. } => "channel_disabled",
        }
    }
}

/// 服务层错误
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("dispatcher channel closed")]
    ChannelClosed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, RouterError>;

/// 错误代码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// 成功
    Success = 0,
    /// 配置错误
    Configuration = 1000,
    /// 输入格式错误
    InvalidInput = 2000,
    /// 执行失败
    Execution = 4000,
    /// 服务不可用
    ServiceUnavailable = 5000,
    /// 内部错误
    Internal = 9000,
}

impl From<&RouterError> for ErrorCode {
    fn from(error: &RouterError) -> Self {
        match error {
            RouterError::Config(_) => ErrorCode::Configuration,
            RouterError::InvalidInput(_) => ErrorCode::InvalidInput,
            RouterError::Execution(_) => ErrorCode::Execution,
            RouterError::ChannelClosed => ErrorCode::ServiceUnavailable,
            RouterError::Io(_) | RouterError::Serialization(_) => ErrorCode::Internal,
        }
    }
}

/// 错误响应（返回给通道适配器）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: ErrorCode,
    /// 错误消息
    pub message: String,
    /// 时间戳
    pub timestamp: u64,
}

impl ErrorResponse {
    pub fn new(error: &RouterError) -> Self {
        Self {
            code: ErrorCode::from(error),
            message: error.to_string(),
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = RouterError::InvalidInput("switch requires a channel name".to_string());
        assert_eq!(ErrorCode::from(&err), ErrorCode::InvalidInput);

        let response = ErrorResponse::new(&err);
        assert_eq!(response.code, ErrorCode::InvalidInput);
        assert!(response.message.starts_with("invalid input"));

        let err = RouterError::from(ConfigError::DuplicateIntent("orders.view".to_string()));
        assert_eq!(ErrorCode::from(&err), ErrorCode::Configuration);
        assert_eq!(ErrorCode::from(&RouterError::ChannelClosed), ErrorCode::ServiceUnavailable);
    }

    #[test]
    fn test_rejection_serializes_with_reason_tag() {
        let rejection = Rejection::UnknownIntent {
            intent_id: "x.y".to_string(),
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["reason"], "unknown_intent");
        assert_eq!(rejection.reason_code(), "unknown_intent");
    }
}
