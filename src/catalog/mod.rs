//! Action Catalog：intent id → 执行目标、确认文案、阈值与冷却策略
//!
//! 启动时加载一次，之后只读，可被多个通道监听器并发读取。

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::ConfigError;
use crate::model::Channel;

pub mod defaults;
pub mod entry;

pub use defaults::default_catalog;
pub use entry::{
    render_template, ActionCatalogEntry, CatalogEntryConfig, CooldownOverrides, CooldownPolicy,
    EntryKind,
};

/// 语音触发词（小写），按配置顺序排列
#[derive(Debug, Clone)]
struct VoiceTrigger {
    phrase: String,
    entry: usize,
}

/// 可用命令说明（用于帮助与 list-commands）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandDescription {
    pub channel: Channel,
    pub trigger: String,
    pub intent_id: String,
    pub description: String,
}

/// 只读意图目录
#[derive(Debug, Clone)]
pub struct ActionCatalog {
    entries: Vec<ActionCatalogEntry>,
    by_id: HashMap<String, usize>,
    voice_triggers: Vec<VoiceTrigger>,
    gestures: HashMap<String, usize>,
    max_cooldown: Duration,
}

impl ActionCatalog {
    /// 校验并加载目录
    pub fn load(configs: &[CatalogEntryConfig]) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(configs.len());
        let mut by_id = HashMap::with_capacity(configs.len());
        let mut voice_triggers = Vec::new();
        let mut gestures: HashMap<String, usize> = HashMap::new();
        let mut max_cooldown = Duration::ZERO;

        for (index, config) in configs.iter().enumerate() {
            let entry = build_entry(index, config)?;

            if by_id.contains_key(&entry.intent_id) {
                return Err(ConfigError::DuplicateIntent(entry.intent_id));
            }

            // 校验后触发词 / 手势标签非空即代表该通道可用
            for phrase in &entry.trigger_phrases {
                voice_triggers.push(VoiceTrigger {
                    phrase: phrase.clone(),
                    entry: index,
                });
            }

            for label in &entry.gesture_labels {
                if let Some(&first) = gestures.get(label) {
                    let first: &ActionCatalogEntry = &entries[first];
                    return Err(ConfigError::DuplicateGestureLabel {
                        label: label.clone(),
                        first: first.intent_id.clone(),
                        second: entry.intent_id.clone(),
                    });
                }
                gestures.insert(label.clone(), index);
            }

            max_cooldown = max_cooldown.max(entry.cooldowns.longest());
            by_id.insert(entry.intent_id.clone(), index);
            entries.push(entry);
        }

        info!(
            "Action catalog loaded: {} intents, {} voice triggers, {} gestures",
            entries.len(),
            voice_triggers.len(),
            gestures.len()
        );

        Ok(Self {
            entries,
            by_id,
            voice_triggers,
            gestures,
            max_cooldown,
        })
    }

    /// 加载内置默认目录
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::load(&default_catalog())
    }

    pub fn get(&self, intent_id: &str) -> Option<&ActionCatalogEntry> {
        self.by_id.get(intent_id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, intent_id: &str) -> bool {
        self.by_id.contains_key(intent_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ActionCatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 目录中最长的冷却时间，用于惰性清理
    pub fn max_cooldown(&self) -> Duration {
        self.max_cooldown
    }

    /// 语音匹配：大小写不敏感的子串包含，按配置顺序第一个命中的意图胜出
    pub fn match_transcript(&self, transcript: &str) -> Option<(&ActionCatalogEntry, &str)> {
        let text = transcript.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        self.voice_triggers
            .iter()
            .find(|trigger| text.contains(trigger.phrase.as_str()))
            .map(|trigger| (&self.entries[trigger.entry], trigger.phrase.as_str()))
    }

    /// 手势标签查找（大小写不敏感）
    pub fn lookup_gesture(&self, label: &str) -> Option<&ActionCatalogEntry> {
        let label = label.trim().to_lowercase();
        self.gestures.get(&label).map(|&i| &self.entries[i])
    }

    /// 列出所有语音触发词与手势
    pub fn command_listing(&self) -> Vec<CommandDescription> {
        let voice = self.voice_triggers.iter().map(|trigger| {
            let entry = &self.entries[trigger.entry];
            CommandDescription {
                channel: Channel::Voice,
                trigger: trigger.phrase.clone(),
                intent_id: entry.intent_id.clone(),
                description: entry.description.clone(),
            }
        });

        let mut gestures: Vec<_> = self
            .gestures
            .iter()
            .map(|(label, &i)| {
                let entry = &self.entries[i];
                CommandDescription {
                    channel: Channel::Gesture,
                    trigger: label.clone(),
                    intent_id: entry.intent_id.clone(),
                    description: entry.description.clone(),
                }
            })
            .collect();
        gestures.sort_by(|a, b| a.trigger.cmp(&b.trigger));

        voice.chain(gestures).collect()
    }
}

fn build_entry(index: usize, config: &CatalogEntryConfig) -> Result<ActionCatalogEntry, ConfigError> {
    let intent_id = config.intent_id.trim().to_string();
    if intent_id.is_empty() {
        return Err(ConfigError::EmptyIntentId { index });
    }

    let target = config.target.trim().to_string();
    if target.is_empty() {
        return Err(ConfigError::EmptyTarget { intent_id });
    }

    let min_confidence = config.min_confidence;
    if !(0.0..=1.0).contains(&min_confidence) {
        return Err(ConfigError::ConfidenceOutOfRange {
            intent_id,
            value: min_confidence,
        });
    }

    let trigger_phrases = normalize_keys(&intent_id, &config.trigger_phrases, "trigger phrase")?;
    let gesture_labels = normalize_keys(&intent_id, &config.gesture_labels, "gesture label")?;

    let mut voice_enabled = !trigger_phrases.is_empty();
    let mut gesture_enabled = !gesture_labels.is_empty();
    for name in &config.channels {
        match Channel::from_str(name) {
            Some(Channel::Ui) => {}
            Some(Channel::Voice) => voice_enabled = true,
            Some(Channel::Gesture) => gesture_enabled = true,
            None => {
                return Err(ConfigError::UnknownChannel {
                    intent_id,
                    channel: name.clone(),
                })
            }
        }
    }

    if voice_enabled && trigger_phrases.is_empty() {
        return Err(ConfigError::MissingTriggers {
            intent_id,
            channel: Channel::Voice,
            what: "trigger phrases",
        });
    }
    if gesture_enabled && gesture_labels.is_empty() {
        return Err(ConfigError::MissingTriggers {
            intent_id,
            channel: Channel::Gesture,
            what: "gesture labels",
        });
    }

    Ok(ActionCatalogEntry {
        intent_id,
        target,
        response_template: config.response_template.clone(),
        description: config.description.clone(),
        min_confidence,
        trigger_phrases,
        gesture_labels,
        required_params: config.required_params.clone(),
        default_params: config.params.clone(),
        cooldowns: CooldownPolicy::resolve(config.kind, &config.cooldown_ms),
    })
}

fn normalize_keys(intent_id: &str, keys: &[String], what: &'static str) -> Result<Vec<String>, ConfigError> {
    keys.iter()
        .map(|key| {
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                Err(ConfigError::BlankTrigger {
                    intent_id: intent_id.to_string(),
                    what,
                })
            } else {
                Ok(key)
            }
        })
        .collect()
}
