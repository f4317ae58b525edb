//! Intent Router：唯一的仲裁点
//!
//! 每次提交依次做：目录查找 → 置信度门限 → 冷却检查 → 记录触发并生成 Action。
//! 路由器通过 `&mut self` 串行处理，检查与记录之间不会被其他提交插入；
//! 多通道并发时由 `dispatcher` 把提交排成单一顺序。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::channel_switches::ChannelSwitches;
use super::clock::Clock;
use super::cooldown::{CooldownKey, CooldownTracker};
use super::metrics;
use crate::catalog::ActionCatalog;
use crate::error::Rejection;
use crate::model::{Action, Intent};

/// 冷却作用域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownScope {
    /// (通道, intent id)：不同通道互不影响
    #[default]
    PerChannel,
    /// intent id：任一通道触发后所有通道共同冷却，窗口取提交通道的配置
    Global,
}

impl CooldownScope {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "per_channel" | "per-channel" | "channel" => Some(CooldownScope::PerChannel),
            "global" => Some(CooldownScope::Global),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CooldownScope::PerChannel => "per_channel",
            CooldownScope::Global => "global",
        }
    }
}

/// 一次提交的路由结果
pub type RouteDecision = Result<Action, Rejection>;

/// 路由器配置
#[derive(Debug, Clone)]
pub struct IntentRouterConfig {
    pub cooldown_scope: CooldownScope,
    /// 冷却记录超过该数量时触发惰性清理
    pub prune_threshold: usize,
}

impl Default for IntentRouterConfig {
    fn default() -> Self {
        Self {
            cooldown_scope: CooldownScope::PerChannel,
            prune_threshold: 1024,
        }
    }
}

/// 路由统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouterStats {
    pub accepted: u64,
    pub rejected_unknown_intent: u64,
    pub rejected_low_confidence: u64,
    pub rejected_cooldown: u64,
    pub rejected_channel_disabled: u64,
    pub cooldown_entries: usize,
}

impl RouterStats {
    pub fn rejected(&self) -> u64 {
        self.rejected_unknown_intent
            + self.rejected_low_confidence
            + self.rejected_cooldown
            + self.rejected_channel_disabled
    }
}

pub struct IntentRouter {
    catalog: Arc<ActionCatalog>,
    tracker: CooldownTracker,
    clock: Arc<dyn Clock>,
    switches: ChannelSwitches,
    config: IntentRouterConfig,
    stats: RouterStats,
}

impl IntentRouter {
    pub fn new(catalog: Arc<ActionCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(catalog, clock, IntentRouterConfig::default())
    }

    pub fn with_config(catalog: Arc<ActionCatalog>, clock: Arc<dyn Clock>, config: IntentRouterConfig) -> Self {
        Self {
            catalog,
            tracker: CooldownTracker::new(),
            clock,
            switches: ChannelSwitches::new(),
            config,
            stats: RouterStats::default(),
        }
    }

    pub fn switches(&self) -> &ChannelSwitches {
        &self.switches
    }

    pub fn cooldown_scope(&self) -> CooldownScope {
        self.config.cooldown_scope
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            cooldown_entries: self.tracker.len(),
            ..self.stats.clone()
        }
    }

    /// 提交一个意图，按处理时刻的时钟判断冷却
    pub fn submit(&mut self, intent: &Intent) -> RouteDecision {
        let now = self.clock.now();
        let decision = self.evaluate(intent, now);

        match &decision {
            Ok(action) => {
                self.stats.accepted += 1;
                metrics::record_intent_accepted(intent.source());
                debug!(
                    source = %intent.source(),
                    intent_id = %intent.intent_id(),
                    target = %action.target,
                    "Intent accepted"
                );
            }
            Err(rejection) => {
                match rejection {
                    Rejection::UnknownIntent { .. } => self.stats.rejected_unknown_intent += 1,
                    Rejection::LowConfidence { .. } => self.stats.rejected_low_confidence += 1,
                    Rejection::Cooldown { .. } => self.stats.rejected_cooldown += 1,
                    Rejection::ChannelDisabled { .. } => self.stats.rejected_channel_disabled += 1,
                }
                metrics::record_intent_rejected(intent.source(), rejection.reason_code());
                info!(
                    source = %intent.source(),
                    intent_id = %intent.intent_id(),
                    reason = rejection.reason_code(),
                    "Intent rejected: {}",
                    rejection
                );
            }
        }

        decision
    }

    fn evaluate(&mut self, intent: &Intent, now: Duration) -> RouteDecision {
        let source = intent.source();
        if !self.switches.is_enabled(source) {
            return Err(Rejection::ChannelDisabled { channel: source });
        }

        let catalog = Arc::clone(&self.catalog);
        let entry = catalog
            .get(intent.intent_id())
            .ok_or_else(|| Rejection::UnknownIntent {
                intent_id: intent.intent_id().to_string(),
            })?;

        // UI 置信度恒为 1.0，不参与门限
        if source.is_classified() && intent.confidence() < entry.min_confidence() {
            return Err(Rejection::LowConfidence {
                intent_id: entry.intent_id().to_string(),
                confidence: intent.confidence(),
                min_confidence: entry.min_confidence(),
            });
        }

        let key = self.cooldown_key(intent);
        let cooldown = entry.cooldown_for(source);
        let remaining = self.tracker.remaining(&key, now, cooldown);
        if !remaining.is_zero() {
            return Err(Rejection::Cooldown {
                intent_id: entry.intent_id().to_string(),
                channel: source,
                remaining_ms: ceil_millis(remaining),
            });
        }

        // 只有确认接受才写入冷却状态
        self.tracker.record(key, now);
        self.prune_if_needed(now);

        let mut params = entry.default_params().clone();
        params.extend(intent.params());
        let confirmation_text = entry.render_confirmation(&params);

        Ok(Action {
            action_id: Uuid::new_v4(),
            emission_id: intent.emission_id(),
            source,
            intent_id: entry.intent_id().to_string(),
            target: entry.target().to_string(),
            params,
            confirmation_text,
            accepted_at: Utc::now(),
        })
    }

    fn cooldown_key(&self, intent: &Intent) -> CooldownKey {
        match self.config.cooldown_scope {
            CooldownScope::PerChannel => CooldownKey::per_channel(intent.source(), intent.intent_id()),
            CooldownScope::Global => CooldownKey::global(intent.intent_id()),
        }
    }

    fn prune_if_needed(&mut self, now: Duration) {
        if self.tracker.len() <= self.config.prune_threshold {
            return;
        }
        let removed = self.tracker.prune(now, self.catalog.max_cooldown());
        debug!("Pruned {} expired cooldown entries", removed);
        metrics::record_cooldown_entries(self.tracker.len());
    }
}

/// 向上取整到毫秒，非零时长至少为 1
fn ceil_millis(duration: Duration) -> u64 {
    duration.as_nanos().div_ceil(1_000_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntryConfig;
    use crate::infra::clock::ManualClock;
    use crate::model::Channel;
    use serde_json::{json, Value};

    fn setup(scope: CooldownScope) -> (IntentRouter, ManualClock) {
        let catalog = ActionCatalog::load(&[
            CatalogEntryConfig::new("catalog.toggle_status", "toggle_item_status")
                .response("Toggling status for item {item_id}")
                .min_confidence(0.6)
                .gestures(&["thumb_up"])
                .cooldown(Channel::Gesture, 1000),
            CatalogEntryConfig::new("catalog.refresh", "refresh_catalog")
                .min_confidence(0.5)
                .triggers(&["refresh catalog"]),
        ])
        .unwrap();
        let clock = ManualClock::new();
        let router = IntentRouter::with_config(
            Arc::new(catalog),
            Arc::new(clock.clone()),
            IntentRouterConfig {
                cooldown_scope: scope,
                prune_threshold: 1024,
            },
        );
        (router, clock)
    }

    fn gesture(confidence: f64) -> Intent {
        Intent::new(
            Channel::Gesture,
            "catalog.toggle_status",
            "toggle_item_status",
            confidence,
            json!({ "params": { "item_id": "ITEM_1" } }),
        )
    }

    #[test]
    fn test_unknown_intent_rejected() {
        let (mut router, _) = setup(CooldownScope::PerChannel);
        let intent = Intent::new(Channel::Ui, "orders.teleport", "", 1.0, Value::Null);
        assert_eq!(
            router.submit(&intent),
            Err(Rejection::UnknownIntent {
                intent_id: "orders.teleport".to_string()
            })
        );
    }

    #[test]
    fn test_low_confidence_does_not_consume_cooldown() {
        let (mut router, clock) = setup(CooldownScope::PerChannel);
        assert!(matches!(
            router.submit(&gesture(0.3)),
            Err(Rejection::LowConfidence { .. })
        ));
        clock.advance_millis(1);
        assert!(router.submit(&gesture(0.9)).is_ok());
    }

    #[test]
    fn test_action_carries_rendered_confirmation() {
        let (mut router, _) = setup(CooldownScope::PerChannel);
        let action = router.submit(&gesture(0.8)).unwrap();
        assert_eq!(action.target, "toggle_item_status");
        assert_eq!(action.param("item_id"), Some("ITEM_1"));
        assert_eq!(action.confirmation_text, "Toggling status for item ITEM_1");
    }

    #[test]
    fn test_cooldown_remaining_reported() {
        let (mut router, clock) = setup(CooldownScope::PerChannel);
        router.submit(&gesture(0.8)).unwrap();
        clock.set_millis(400);
        assert_eq!(
            router.submit(&gesture(0.8)),
            Err(Rejection::Cooldown {
                intent_id: "catalog.toggle_status".to_string(),
                channel: Channel::Gesture,
                remaining_ms: 600,
            })
        );
        assert_eq!(router.stats().rejected_cooldown, 1);
    }

    #[test]
    fn test_remaining_rounds_up_to_whole_millis() {
        assert_eq!(ceil_millis(Duration::ZERO), 0);
        assert_eq!(ceil_millis(Duration::from_nanos(1)), 1);
        assert_eq!(ceil_millis(Duration::from_nanos(999)), 1);
        assert_eq!(ceil_millis(Duration::from_micros(1500)), 2);
        assert_eq!(ceil_millis(Duration::from_millis(600)), 600);
    }

    #[test]
    fn test_global_scope_shares_window_across_channels() {
        let (mut router, clock) = setup(CooldownScope::Global);
        let ui = Intent::new(Channel::Ui, "catalog.toggle_status", "", 1.0, Value::Null);

        // UI 窗口为 0，不影响下一次 UI
        router.submit(&ui).unwrap();
        clock.set_millis(10);
        assert!(matches!(
            router.submit(&gesture(0.9)),
            Err(Rejection::Cooldown { .. })
        ));
        assert!(router.submit(&ui).is_ok());
    }

    #[test]
    fn test_disabled_channel_rejected() {
        let (mut router, _) = setup(CooldownScope::PerChannel);
        router.switches().disable(Channel::Gesture);
        assert_eq!(
            router.submit(&gesture(0.9)),
            Err(Rejection::ChannelDisabled {
                channel: Channel::Gesture
            })
        );
        router.switches().enable(Channel::Gesture);
        assert!(router.submit(&gesture(0.9)).is_ok());
    }

    #[test]
    fn test_lazy_prune() {
        let catalog = ActionCatalog::load(&[CatalogEntryConfig::new("catalog.refresh", "refresh_catalog")
            .cooldown(Channel::Ui, 100)])
        .unwrap();
        let clock = ManualClock::new();
        let mut router = IntentRouter::with_config(
            Arc::new(catalog),
            Arc::new(clock.clone()),
            IntentRouterConfig {
                cooldown_scope: CooldownScope::PerChannel,
                prune_threshold: 1,
            },
        );
        let ui = Intent::new(Channel::Ui, "catalog.refresh", "", 1.0, Value::Null);
        let voice = Intent::new(Channel::Voice, "catalog.refresh", "", 1.0, Value::Null);

        router.submit(&ui).unwrap();
        clock.set_millis(500);
        router.submit(&voice).unwrap();
        assert_eq!(router.stats().cooldown_entries, 1);
    }
}
