//! Intent Normalizer：把各通道的原始事件转换为统一的 `Intent`
//!
//! - UI：事件自带 intent id，直接拷贝，置信度固定 1.0
//! - 语音：按配置顺序做大小写不敏感的子串匹配
//! - 手势：标签直接查表，置信度低于目录阈值视为无法识别

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::catalog::{ActionCatalog, ActionCatalogEntry};
use crate::error::UnrecognizedInputError;
use crate::model::{Channel, Intent, RawEvent};

/// 选择上下文参数名
const ITEM_ID_PARAM: &str = "item_id";

pub struct IntentNormalizer {
    catalog: Arc<ActionCatalog>,
    /// 转写服务未给出置信度时使用
    default_voice_confidence: f64,
    /// 当前选中的商品，供上下文相关的手势/语音使用
    selected_item: RwLock<Option<String>>,
}

impl IntentNormalizer {
    pub fn new(catalog: Arc<ActionCatalog>) -> Self {
        Self {
            catalog,
            default_voice_confidence: 1.0,
            selected_item: RwLock::new(None),
        }
    }

    pub fn with_default_voice_confidence(mut self, confidence: f64) -> Self {
        if confidence.is_finite() {
            self.default_voice_confidence = confidence.clamp(0.0, 1.0);
        }
        self
    }

    pub fn catalog(&self) -> &Arc<ActionCatalog> {
        &self.catalog
    }

    /// 更新当前选中的商品
    pub fn set_selected_item(&self, item_id: Option<String>) {
        let item_id = item_id.filter(|id| !id.trim().is_empty());
        info!("Selected item updated: {:?}", item_id);
        *self.selected_item.write() = item_id;
    }

    pub fn selected_item(&self) -> Option<String> {
        self.selected_item.read().clone()
    }

    pub fn normalize(&self, event: &RawEvent) -> Result<Intent, UnrecognizedInputError> {
        match event {
            RawEvent::Ui {
                intent_id,
                target,
                params,
            } => self.normalize_ui(intent_id, target.as_deref(), params),
            RawEvent::Voice {
                transcript,
                confidence,
            } => self.normalize_voice(transcript, *confidence),
            RawEvent::Gesture { label, confidence } => self.normalize_gesture(label, *confidence),
        }
    }

    /// UI 事件：直接拷贝字段；未知 intent 交给路由器拒绝
    pub fn normalize_ui(
        &self,
        intent_id: &str,
        target: Option<&str>,
        params: &BTreeMap<String, Value>,
    ) -> Result<Intent, UnrecognizedInputError> {
        let intent_id = intent_id.trim();
        if intent_id.is_empty() {
            return Err(UnrecognizedInputError::EmptyUiIntent);
        }

        let target = target
            .map(str::to_string)
            .or_else(|| self.catalog.get(intent_id).map(|e| e.target().to_string()))
            .unwrap_or_default();

        let params: Map<String, Value> = params.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let payload = json!({
            "intent_id": intent_id,
            "target": target,
            "params": params,
        });

        Ok(Intent::new(Channel::Ui, intent_id, target, 1.0, payload))
    }

    /// 语音转写：空串或乱码视为无匹配
    pub fn normalize_voice(
        &self,
        transcript: &str,
        confidence: Option<f64>,
    ) -> Result<Intent, UnrecognizedInputError> {
        let Some((entry, phrase)) = self.catalog.match_transcript(transcript) else {
            debug!("No matching voice command found: {:?}", transcript);
            return Err(UnrecognizedInputError::NoTriggerMatch {
                transcript: transcript.to_string(),
            });
        };

        let confidence = confidence.unwrap_or(self.default_voice_confidence);
        let payload = json!({
            "transcript": transcript,
            "matched_phrase": phrase,
            "params": self.context_params(entry),
        });

        Ok(Intent::new(
            Channel::Voice,
            entry.intent_id(),
            entry.target(),
            confidence,
            payload,
        ))
    }

    /// 手势：未映射或置信度不足都视为无法识别
    pub fn normalize_gesture(&self, label: &str, confidence: f64) -> Result<Intent, UnrecognizedInputError> {
        let Some(entry) = self.catalog.lookup_gesture(label) else {
            return Err(UnrecognizedInputError::UnmappedGesture {
                label: label.to_string(),
            });
        };

        // NaN 也走这里
        if !(confidence >= entry.min_confidence()) {
            return Err(UnrecognizedInputError::GestureBelowThreshold {
                label: label.to_string(),
                intent_id: entry.intent_id().to_string(),
                confidence,
                min_confidence: entry.min_confidence(),
            });
        }

        let payload = json!({
            "label": label.trim().to_lowercase(),
            "params": self.context_params(entry),
        });

        Ok(Intent::new(
            Channel::Gesture,
            entry.intent_id(),
            entry.target(),
            confidence,
            payload,
        ))
    }

    /// 需要商品 id 的意图从选择上下文补参
    fn context_params(&self, entry: &ActionCatalogEntry) -> Map<String, Value> {
        let mut params = Map::new();
        if entry.required_params().iter().any(|p| p == ITEM_ID_PARAM) {
            if let Some(item_id) = self.selected_item() {
                params.insert(ITEM_ID_PARAM.to_string(), Value::String(item_id));
            }
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntryConfig;

    fn normalizer() -> IntentNormalizer {
        let catalog = ActionCatalog::load(&[
            CatalogEntryConfig::new("catalog.refresh", "refresh_catalog")
                .triggers(&["refresh catalog", "update catalog", "reload items"]),
            CatalogEntryConfig::new("catalog.toggle_status", "toggle_item_status")
                .min_confidence(0.6)
                .gestures(&["thumb_up"])
                .requires(&["item_id"]),
        ])
        .unwrap();
        IntentNormalizer::new(Arc::new(catalog))
    }

    #[test]
    fn test_ui_is_direct_copy() {
        let n = normalizer();
        let mut params = BTreeMap::new();
        params.insert("item_id".to_string(), json!("ITEM_9"));
        let intent = n.normalize_ui("catalog.toggle_status", None, &params).unwrap();

        assert_eq!(intent.source(), Channel::Ui);
        assert_eq!(intent.confidence(), 1.0);
        assert_eq!(intent.target(), "toggle_item_status");
        assert_eq!(intent.params().get("item_id").map(String::as_str), Some("ITEM_9"));
        assert_eq!(
            n.normalize_ui("  ", None, &BTreeMap::new()),
            Err(UnrecognizedInputError::EmptyUiIntent)
        );
    }

    #[test]
    fn test_voice_match_and_default_confidence() {
        let n = normalizer();
        let intent = n.normalize_voice("Please RELOAD items", None).unwrap();
        assert_eq!(intent.intent_id(), "catalog.refresh");
        assert_eq!(intent.confidence(), 1.0);
        assert_eq!(intent.raw_payload()["matched_phrase"], "reload items");

        let intent = n.normalize_voice("update catalog", Some(0.42)).unwrap();
        assert_eq!(intent.confidence(), 0.42);
    }

    #[test]
    fn test_voice_garbage_is_unrecognized() {
        let n = normalizer();
        for transcript in ["", "   ", "%%$#@", "order pizza"] {
            assert!(matches!(
                n.normalize_voice(transcript, None),
                Err(UnrecognizedInputError::NoTriggerMatch { .. })
            ));
        }
    }

    #[test]
    fn test_gesture_threshold_and_unknown_label() {
        let n = normalizer();
        assert!(n.normalize_gesture("thumb_up", 0.8).is_ok());
        assert!(n.normalize_gesture("thumb_up", 0.6).is_ok());
        assert!(matches!(
            n.normalize_gesture("thumb_up", 0.59),
            Err(UnrecognizedInputError::GestureBelowThreshold { .. })
        ));
        assert!(matches!(
            n.normalize_gesture("thumb_up", f64::NAN),
            Err(UnrecognizedInputError::GestureBelowThreshold { .. })
        ));
        assert_eq!(
            n.normalize_gesture("fist", 0.99),
            Err(UnrecognizedInputError::UnmappedGesture {
                label: "fist".to_string()
            })
        );
    }

    #[test]
    fn test_gesture_uses_selection_context() {
        let n = normalizer();
        let intent = n.normalize_gesture("thumb_up", 0.9).unwrap();
        assert!(intent.params().is_empty());

        n.set_selected_item(Some("ITEM_7".to_string()));
        let intent = n.normalize_gesture("THUMB_UP", 0.9).unwrap();
        assert_eq!(intent.params().get("item_id").map(String::as_str), Some("ITEM_7"));

        n.set_selected_item(Some("   ".to_string()));
        assert_eq!(n.selected_item(), None);
    }
}
