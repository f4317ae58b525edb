use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{ActionExecutor, ExecutionOutcome};
use crate::infra::{metrics, EventBus, RoutingEvent};
use crate::model::Action;

/// Executor Worker（动作执行工作器）
///
/// 职责：
/// - 从内存队列接收路由器接受的 Action
/// - 调用执行器，每个 Action 恰好执行一次
/// - 把执行结果发布到事件总线
pub struct ExecutorWorker {
    receiver: mpsc::Receiver<Action>,
    executor: Arc<dyn ActionExecutor>,
    event_bus: EventBus,
}

impl ExecutorWorker {
    pub fn new(receiver: mpsc::Receiver<Action>, executor: Arc<dyn ActionExecutor>, event_bus: EventBus) -> Self {
        Self {
            receiver,
            executor,
            event_bus,
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn start(mut self) {
        info!("[EXECUTOR WORKER] Started");

        while let Some(action) = self.receiver.recv().await {
            self.process_action(action).await;
        }

        info!("[EXECUTOR WORKER] Queue closed, stopping");
    }

    async fn process_action(&self, action: Action) {
        let outcome = match self.executor.execute(&action).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "[EXECUTOR WORKER] Failed to execute action {} ({}): {}",
                    action.action_id, action.intent_id, e
                );
                ExecutionOutcome::error(&action, e.to_string())
            }
        };

        debug!(
            "[EXECUTOR WORKER] Action {} finished: status={}, message={}",
            outcome.action_id,
            outcome.status.as_str(),
            outcome.message
        );
        metrics::record_action_executed(outcome.status.as_str());
        self.event_bus.publish(RoutingEvent::Executed { outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionCatalog;
    use crate::error::{Result, RouterError};
    use crate::executor::{DashboardExecutor, ExecutionStatus};
    use crate::model::Channel;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    struct UnreachableBackend;

    #[async_trait]
    impl ActionExecutor for UnreachableBackend {
        async fn execute(&self, _action: &Action) -> Result<ExecutionOutcome> {
            Err(RouterError::Execution("commerce backend unreachable".to_string()))
        }
    }

    fn view_orders() -> Action {
        Action {
            action_id: Uuid::new_v4(),
            emission_id: Uuid::new_v4(),
            source: Channel::Ui,
            intent_id: "orders.view".to_string(),
            target: "show_orders_dashboard".to_string(),
            params: BTreeMap::new(),
            confirmation_text: "Loading your recent orders...".to_string(),
            accepted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_executor_failure_becomes_error_outcome() {
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(ExecutorWorker::new(rx, Arc::new(UnreachableBackend), bus).start());

        let action = view_orders();
        tx.send(action.clone()).await.unwrap();
        drop(tx);

        match events.recv().await.unwrap() {
            RoutingEvent::Executed { outcome } => {
                assert_eq!(outcome.action_id, action.action_id);
                assert_eq!(outcome.status, ExecutionStatus::Error);
                assert!(outcome.message.contains("commerce backend unreachable"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_worker_publishes_outcome() {
        let catalog = Arc::new(ActionCatalog::with_defaults().unwrap());
        let bus = EventBus::new(16);
        let mut events = bus.subscribe();
        let (tx, rx) = mpsc::channel(4);
        let worker = ExecutorWorker::new(rx, Arc::new(DashboardExecutor::new(catalog)), bus);
        let handle = tokio::spawn(worker.start());

        tx.send(Action {
            action_id: Uuid::new_v4(),
            emission_id: Uuid::new_v4(),
            source: Channel::Voice,
            intent_id: "orders.view".to_string(),
            target: "show_orders_dashboard".to_string(),
            params: BTreeMap::new(),
            confirmation_text: "Loading your recent orders...".to_string(),
            accepted_at: Utc::now(),
        })
        .await
        .unwrap();
        drop(tx);

        match events.recv().await.unwrap() {
            RoutingEvent::Executed { outcome } => {
                assert!(outcome.is_success());
                assert_eq!(outcome.message, "Loading your recent orders...");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        handle.await.unwrap();
    }
}
