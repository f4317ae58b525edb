use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::info;

use super::{ActionExecutor, ExecutionOutcome};
use crate::catalog::ActionCatalog;
use crate::error::Result;
use crate::infra::RouterStats;
use crate::model::Action;

/// 卖家后台执行器
///
/// 不直接调用商品/订单接口，只校验参数并生成界面更新描述，真实的接口调用由宿主完成。
pub struct DashboardExecutor {
    catalog: Arc<ActionCatalog>,
    stats: Option<Arc<RwLock<RouterStats>>>,
}

impl DashboardExecutor {
    pub fn new(catalog: Arc<ActionCatalog>) -> Self {
        Self { catalog, stats: None }
    }

    /// 提供路由统计，`system_status` 使用
    pub fn with_stats(mut self, stats: Arc<RwLock<RouterStats>>) -> Self {
        self.stats = Some(stats);
        self
    }

    fn help(&self, action: &Action) -> ExecutionOutcome {
        let commands: Vec<String> = self
            .catalog
            .command_listing()
            .into_iter()
            .map(|c| format!("{} ({}) - {}", c.trigger, c.channel, c.description))
            .collect();
        ExecutionOutcome::success(action, "Available commands:", false, json!(commands))
    }

    fn status(&self, action: &Action) -> ExecutionOutcome {
        let stats = match &self.stats {
            Some(stats) => serde_json::to_value(&*stats.read()).unwrap_or(Value::Null),
            None => Value::Null,
        };
        let data = json!({
            "available_intents": self.catalog.len(),
            "router": stats,
        });
        ExecutionOutcome::success(action, action.confirmation_text.clone(), false, data)
    }
}

#[async_trait]
impl ActionExecutor for DashboardExecutor {
    async fn execute(&self, action: &Action) -> Result<ExecutionOutcome> {
        info!(
            "[EXECUTOR] Executing action: action_id={}, intent_id={}, target={}, source={}",
            action.action_id, action.intent_id, action.target, action.source
        );

        if let Some(entry) = self.catalog.get(&action.intent_id) {
            let missing = entry
                .required_params()
                .iter()
                .find(|p| action.param(p).map_or(true, |v| v.trim().is_empty()));
            if let Some(param) = missing {
                return Ok(ExecutionOutcome::error(action, format!("Missing {}", param)));
            }
        }

        let outcome = match action.target.as_str() {
            "show_help" => self.help(action),
            "system_status" => self.status(action),
            _ => ExecutionOutcome::success(
                action,
                action.confirmation_text.clone(),
                true,
                json!(action.params),
            ),
        };

        Ok(outcome)
    }
}
