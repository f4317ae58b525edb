//! Intent 模型：原始通道事件与规范化后的用户意图

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::channel::Channel;

/// 原始通道事件（规范化之前）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum RawEvent {
    /// 界面事件，已携带明确的 intent id
    Ui {
        intent_id: String,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        params: BTreeMap<String, Value>,
    },
    /// 语音转写文本，置信度由转写服务提供
    Voice {
        transcript: String,
        #[serde(default)]
        confidence: Option<f64>,
    },
    /// 手势分类结果
    Gesture { label: String, confidence: f64 },
}

impl RawEvent {
    pub fn channel(&self) -> Channel {
        match self {
            RawEvent::Ui { .. } => Channel::Ui,
            RawEvent::Voice { .. } => Channel::Voice,
            RawEvent::Gesture { .. } => Channel::Gesture,
        }
    }
}

/// 规范化后的意图，创建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    emission_id: Uuid,
    source: Channel,
    raw_payload: Value,
    intent_id: String,
    target: String,
    confidence: f64,
    occurred_at: DateTime<Utc>,
}

impl Intent {
    /// 创建意图
    ///
    /// UI 意图的置信度固定为 1.0；其余通道的置信度被限制在 [0, 1]，NaN 视为 0。
    pub fn new(
        source: Channel,
        intent_id: impl Into<String>,
        target: impl Into<String>,
        confidence: f64,
        raw_payload: Value,
    ) -> Self {
        let confidence = match source {
            Channel::Ui => 1.0,
            _ if confidence.is_nan() => 0.0,
            _ => confidence.clamp(0.0, 1.0),
        };

        Self {
            emission_id: Uuid::new_v4(),
            source,
            raw_payload,
            intent_id: intent_id.into(),
            target: target.into(),
            confidence,
            occurred_at: Utc::now(),
        }
    }

    pub fn emission_id(&self) -> Uuid {
        self.emission_id
    }

    pub fn source(&self) -> Channel {
        self.source
    }

    pub fn raw_payload(&self) -> &Value {
        &self.raw_payload
    }

    pub fn intent_id(&self) -> &str {
        &self.intent_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// 从 raw_payload 的 `params` 对象中提取参数
    ///
    /// 字符串原样保留，其余标量按 JSON 文本输出；`null` 被忽略。
    pub fn params(&self) -> BTreeMap<String, String> {
        let Some(params) = self.raw_payload.get("params").and_then(Value::as_object) else {
            return BTreeMap::new();
        };

        params
            .iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    Value::Null => return None,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((key.clone(), text))
            })
            .collect()
    }
}
