//! Prometheus 指标：意图接受/拒绝、无法识别的输入、动作执行结果、冷却表大小
//!
//! 未调用 `init()` 时所有记录都是空操作。

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::model::Channel;

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// 指标名称
const COUNTER_INTENTS_ACCEPTED: &str = "qanat_intents_accepted_total";
const COUNTER_INTENTS_REJECTED: &str = "qanat_intents_rejected_total";
const COUNTER_INPUTS_UNRECOGNIZED: &str = "qanat_inputs_unrecognized_total";
const COUNTER_ACTIONS_EXECUTED: &str = "qanat_actions_executed_total";
const GAUGE_COOLDOWN_ENTRIES: &str = "qanat_cooldown_entries";

/// 安装全局 Recorder 并在 `addr` 上暴露 `/metrics`。
/// 需要在 tokio runtime 内调用；重复调用会返回 Err。
pub fn init(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return Err("metrics already initialized".into());
    }
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(())
}

pub fn record_intent_accepted(source: Channel) {
    metrics::counter!(COUNTER_INTENTS_ACCEPTED, "source" => source.as_str()).increment(1);
}

pub fn record_intent_rejected(source: Channel, reason: &'static str) {
    metrics::counter!(COUNTER_INTENTS_REJECTED, "source" => source.as_str(), "reason" => reason).increment(1);
}

pub fn record_input_unrecognized(source: Channel) {
    metrics::counter!(COUNTER_INPUTS_UNRECOGNIZED, "source" => source.as_str()).increment(1);
}

pub fn record_action_executed(status: &'static str) {
    metrics::counter!(COUNTER_ACTIONS_EXECUTED, "status" => status).increment(1);
}

pub fn record_cooldown_entries(count: usize) {
    metrics::gauge!(GAUGE_COOLDOWN_ENTRIES).set(count as f64);
}
