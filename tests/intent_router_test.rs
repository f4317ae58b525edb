use std::sync::Arc;

use qanat_router::catalog::{ActionCatalog, CatalogEntryConfig};
use qanat_router::error::{ConfigError, Rejection, UnrecognizedInputError};
use qanat_router::infra::{CooldownScope, IntentRouter, IntentRouterConfig, ManualClock};
use qanat_router::model::{Channel, Intent, RawEvent};
use qanat_router::normalizer::IntentNormalizer;
use serde_json::Value;

/// thumb_up -> catalog.toggle_status（1000ms，0.6）以及语音刷新
fn catalog() -> Arc<ActionCatalog> {
    let catalog = ActionCatalog::load(&[
        CatalogEntryConfig::new("catalog.toggle_status", "toggle_item_status")
            .response("Toggling status for item {item_id}")
            .min_confidence(0.6)
            .gestures(&["thumb_up"])
            .cooldown(Channel::Gesture, 1000),
        CatalogEntryConfig::new("catalog.refresh", "refresh_catalog")
            .response("Refreshing your catalog items...")
            .min_confidence(0.5)
            .triggers(&["refresh catalog", "update catalog", "reload items"]),
        CatalogEntryConfig::new("orders.view", "show_orders_dashboard")
            .min_confidence(0.5)
            .triggers(&["show orders"]),
    ])
    .expect("catalog should load");
    Arc::new(catalog)
}

fn setup(scope: CooldownScope) -> (IntentNormalizer, IntentRouter, ManualClock) {
    let catalog = catalog();
    let clock = ManualClock::new();
    let router = IntentRouter::with_config(
        Arc::clone(&catalog),
        Arc::new(clock.clone()),
        IntentRouterConfig {
            cooldown_scope: scope,
            ..IntentRouterConfig::default()
        },
    );
    (IntentNormalizer::new(catalog), router, clock)
}

fn thumb_up(confidence: f64) -> RawEvent {
    RawEvent::Gesture {
        label: "thumb_up".to_string(),
        confidence,
    }
}

#[test]
fn test_gesture_cooldown_scenario() {
    let (normalizer, mut router, clock) = setup(CooldownScope::PerChannel);

    let intent = normalizer.normalize(&thumb_up(0.8)).unwrap();
    let action = router.submit(&intent).unwrap();
    assert_eq!(action.target, "toggle_item_status");

    clock.set_millis(500);
    let intent = normalizer.normalize(&thumb_up(0.8)).unwrap();
    match router.submit(&intent) {
        Err(Rejection::Cooldown { remaining_ms, .. }) => assert_eq!(remaining_ms, 500),
        other => panic!("expected cooldown, got {:?}", other),
    }

    clock.set_millis(1001);
    let intent = normalizer.normalize(&thumb_up(0.8)).unwrap();
    assert!(router.submit(&intent).is_ok());
}

#[test]
fn test_voice_without_cooldown_fires_every_time() {
    let (normalizer, mut router, _clock) = setup(CooldownScope::PerChannel);
    let event = RawEvent::Voice {
        transcript: "please reload items".to_string(),
        confidence: None,
    };

    for _ in 0..3 {
        let intent = normalizer.normalize(&event).unwrap();
        assert_eq!(intent.confidence(), 1.0);
        let action = router.submit(&intent).unwrap();
        assert_eq!(action.intent_id, "catalog.refresh");
        assert_eq!(action.confirmation_text, "Refreshing your catalog items...");
    }
}

#[test]
fn test_unmapped_gesture_never_reaches_router() {
    let (normalizer, router, _clock) = setup(CooldownScope::PerChannel);
    let result = normalizer.normalize(&RawEvent::Gesture {
        label: "fist".to_string(),
        confidence: 0.99,
    });

    assert_eq!(
        result,
        Err(UnrecognizedInputError::UnmappedGesture {
            label: "fist".to_string()
        })
    );
    assert_eq!(router.stats().accepted + router.stats().rejected(), 0);
}

#[test]
fn test_ui_and_gesture_fire_independently_per_channel() {
    let (normalizer, mut router, clock) = setup(CooldownScope::PerChannel);

    let gesture = normalizer.normalize(&thumb_up(0.9)).unwrap();
    router.submit(&gesture).unwrap();

    clock.set_millis(200);
    let ui = Intent::new(Channel::Ui, "catalog.toggle_status", "toggle_item_status", 1.0, Value::Null);
    assert!(router.submit(&ui).is_ok());

    // 手势自己的窗口仍然有效
    clock.set_millis(400);
    let gesture = normalizer.normalize(&thumb_up(0.9)).unwrap();
    assert!(matches!(router.submit(&gesture), Err(Rejection::Cooldown { .. })));
}

#[test]
fn test_global_scope_blocks_other_channels() {
    let (normalizer, mut router, clock) = setup(CooldownScope::Global);

    let gesture = normalizer.normalize(&thumb_up(0.9)).unwrap();
    router.submit(&gesture).unwrap();

    // UI 窗口为 0，即使共享 key 也不受限
    clock.set_millis(200);
    let ui = Intent::new(Channel::Ui, "catalog.toggle_status", "", 1.0, Value::Null);
    assert!(router.submit(&ui).is_ok());

    clock.set_millis(300);
    let gesture = normalizer.normalize(&thumb_up(0.9)).unwrap();
    assert!(matches!(router.submit(&gesture), Err(Rejection::Cooldown { .. })));
}

#[test]
fn test_accepted_actions_respect_cooldown_window() {
    let (normalizer, mut router, clock) = setup(CooldownScope::PerChannel);
    let mut accepted_at = Vec::new();

    let mut now = 0;
    while now < 5000 {
        clock.set_millis(now);
        let intent = normalizer.normalize(&thumb_up(0.8)).unwrap();
        if router.submit(&intent).is_ok() {
            accepted_at.push(now);
        }
        now += 137;
    }

    assert!(accepted_at.len() > 1);
    for pair in accepted_at.windows(2) {
        assert!(pair[1] - pair[0] >= 1000, "accepted too close: {:?}", pair);
    }
}

#[test]
fn test_low_confidence_voice_rejected() {
    let (normalizer, mut router, _clock) = setup(CooldownScope::PerChannel);
    let intent = normalizer
        .normalize(&RawEvent::Voice {
            transcript: "show orders".to_string(),
            confidence: Some(0.49),
        })
        .unwrap();

    assert_eq!(
        router.submit(&intent),
        Err(Rejection::LowConfidence {
            intent_id: "orders.view".to_string(),
            confidence: 0.49,
            min_confidence: 0.5,
        })
    );
}

#[test]
fn test_ui_never_rejected_for_confidence() {
    let catalog = ActionCatalog::load(&[CatalogEntryConfig::new("orders.refresh", "refresh_orders")
        .min_confidence(1.0)])
    .unwrap();
    let mut router = IntentRouter::new(Arc::new(catalog), Arc::new(ManualClock::new()));

    // UI 置信度在构造时就被固定为 1.0
    let intent = Intent::new(Channel::Ui, "orders.refresh", "refresh_orders", 0.1, Value::Null);
    assert_eq!(intent.confidence(), 1.0);
    assert!(router.submit(&intent).is_ok());
}

#[test]
fn test_repeated_failures_do_not_block_later_attempt() {
    let (normalizer, mut router, _clock) = setup(CooldownScope::PerChannel);
    let low = Intent::new(Channel::Gesture, "catalog.toggle_status", "toggle_item_status", 0.2, Value::Null);
    for _ in 0..5 {
        assert!(router.submit(&low).is_err());
    }

    let intent = normalizer.normalize(&thumb_up(0.7)).unwrap();
    assert!(router.submit(&intent).is_ok());
}

#[test]
fn test_duplicate_intent_is_config_error() {
    let result = ActionCatalog::load(&[
        CatalogEntryConfig::new("orders.view", "show_orders_dashboard"),
        CatalogEntryConfig::new("orders.view", "show_orders_again"),
    ]);
    assert!(matches!(result, Err(ConfigError::DuplicateIntent(id)) if id == "orders.view"));
}

#[test]
fn test_default_catalog_loads() {
    let catalog = ActionCatalog::with_defaults().unwrap();
    assert!(catalog.contains("catalog.toggle_status"));
    assert_eq!(
        catalog.lookup_gesture("point_index").map(|e| e.intent_id()),
        Some("ui.select")
    );
}
