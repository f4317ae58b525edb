//! 目录条目：配置形态与加载后的只读形态

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::Channel;

/// 默认手势冷却时间（毫秒）
pub const DEFAULT_GESTURE_COOLDOWN_MS: u64 = 1000;
/// 选择类手势的默认冷却时间（毫秒）
pub const DEFAULT_SELECTION_COOLDOWN_MS: u64 = 500;

/// 意图类别，决定默认手势冷却时间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Command,
    Selection,
}

/// 每个通道的冷却覆盖值（毫秒），未配置时使用默认值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gesture: Option<u64>,
}

impl CooldownOverrides {
    pub fn is_empty(&self) -> bool {
        self.ui.is_none() && self.voice.is_none() && self.gesture.is_none()
    }
}

/// TOML 中的 `[[catalog]]` 条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntryConfig {
    pub intent_id: String,
    pub target: String,
    #[serde(default)]
    pub response_template: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_confidence: f64,
    #[serde(default)]
    pub kind: EntryKind,
    /// 额外开放的通道（voice / gesture），UI 始终可用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_phrases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gesture_labels: Vec<String>,
    /// 执行器要求的参数
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_params: Vec<String>,
    /// 静态默认参数，意图自带参数优先
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "CooldownOverrides::is_empty")]
    pub cooldown_ms: CooldownOverrides,
}

impl CatalogEntryConfig {
    pub fn new(intent_id: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            intent_id: intent_id.into(),
            target: target.into(),
            response_template: String::new(),
            description: String::new(),
            min_confidence: 0.0,
            kind: EntryKind::Command,
            channels: Vec::new(),
            trigger_phrases: Vec::new(),
            gesture_labels: Vec::new(),
            required_params: Vec::new(),
            params: BTreeMap::new(),
            cooldown_ms: CooldownOverrides::default(),
        }
    }

    pub fn response(mut self, template: &str) -> Self {
        self.response_template = template.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn min_confidence(mut self, value: f64) -> Self {
        self.min_confidence = value;
        self
    }

    pub fn selection(mut self) -> Self {
        self.kind = EntryKind::Selection;
        self
    }

    pub fn triggers(mut self, phrases: &[&str]) -> Self {
        self.trigger_phrases = phrases.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn gestures(mut self, labels: &[&str]) -> Self {
        self.gesture_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn requires(mut self, params: &[&str]) -> Self {
        self.required_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn default_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn cooldown(mut self, channel: Channel, millis: u64) -> Self {
        match channel {
            Channel::Ui => self.cooldown_ms.ui = Some(millis),
            Channel::Voice => self.cooldown_ms.voice = Some(millis),
            Channel::Gesture => self.cooldown_ms.gesture = Some(millis),
        }
        self
    }
}

/// 已解析的冷却策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    pub ui: Duration,
    pub voice: Duration,
    pub gesture: Duration,
}

impl CooldownPolicy {
    pub fn resolve(kind: EntryKind, overrides: &CooldownOverrides) -> Self {
        let gesture_default = match kind {
            EntryKind::Command => DEFAULT_GESTURE_COOLDOWN_MS,
            EntryKind::Selection => DEFAULT_SELECTION_COOLDOWN_MS,
        };
        Self {
            ui: Duration::from_millis(overrides.ui.unwrap_or(0)),
            voice: Duration::from_millis(overrides.voice.unwrap_or(0)),
            gesture: Duration::from_millis(overrides.gesture.unwrap_or(gesture_default)),
        }
    }

    pub fn for_channel(&self, channel: Channel) -> Duration {
        match channel {
            Channel::Ui => self.ui,
            Channel::Voice => self.voice,
            Channel::Gesture => self.gesture,
        }
    }

    pub fn longest(&self) -> Duration {
        self.ui.max(self.voice).max(self.gesture)
    }
}

/// 加载后的只读目录条目
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCatalogEntry {
    pub(crate) intent_id: String,
    pub(crate) target: String,
    pub(crate) response_template: String,
    pub(crate) description: String,
    pub(crate) min_confidence: f64,
    pub(crate) trigger_phrases: Vec<String>,
    pub(crate) gesture_labels: Vec<String>,
    pub(crate) required_params: Vec<String>,
    pub(crate) default_params: BTreeMap<String, String>,
    pub(crate) cooldowns: CooldownPolicy,
}

impl ActionCatalogEntry {
    pub fn intent_id(&self) -> &str {
        &self.intent_id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn response_template(&self) -> &str {
        &self.response_template
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn trigger_phrases(&self) -> &[String] {
        &self.trigger_phrases
    }

    pub fn gesture_labels(&self) -> &[String] {
        &self.gesture_labels
    }

    pub fn required_params(&self) -> &[String] {
        &self.required_params
    }

    pub fn default_params(&self) -> &BTreeMap<String, String> {
        &self.default_params
    }

    pub fn cooldowns(&self) -> &CooldownPolicy {
        &self.cooldowns
    }

    pub fn cooldown_for(&self, channel: Channel) -> Duration {
        self.cooldowns.for_channel(channel)
    }

    /// 渲染确认文案；模板为空时退回到描述或 intent id
    pub fn render_confirmation(&self, params: &BTreeMap<String, String>) -> String {
        if self.response_template.is_empty() {
            if self.description.is_empty() {
                return self.intent_id.clone();
            }
            return self.description.clone();
        }
        render_template(&self.response_template, params)
    }
}

/// 替换 `{name}` 占位符；未知占位符原样保留
pub fn render_template(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match params.get(name) {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
