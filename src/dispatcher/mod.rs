//! 意图分发器
//!
//! 三个通道的监听器并发提交意图，分发器在单个任务里独占 `IntentRouter`，
//! 按到达顺序逐个处理，保证冷却的检查与记录是原子的。

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{Result, RouterError, UnrecognizedInputError};
use crate::infra::{
    metrics, ChannelSwitches, EventBus, HistoryRecord, IntentHistory, IntentRouter, RouteDecision,
    RouterStats, RoutingEvent, DEFAULT_HISTORY_CAPACITY,
};
use crate::model::{Action, Channel, Intent};

/// 默认提交队列容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct Submission {
    intent: Intent,
    reply: oneshot::Sender<RouteDecision>,
}

/// 意图分发器（持有路由器的唯一写者）
pub struct IntentDispatcher {
    router: IntentRouter,
    receiver: mpsc::Receiver<Submission>,
    actions: Option<mpsc::UnboundedSender<Action>>,
    forwarder: Option<ActionForwarder>,
    event_bus: EventBus,
    history: Arc<IntentHistory>,
    stats: Arc<RwLock<RouterStats>>,
}

impl IntentDispatcher {
    /// 运行分发循环，所有 `DispatcherHandle` 被丢弃后返回
    ///
    /// 返回前会等待积压的 Action 全部交给执行器队列。
    pub async fn run(mut self) {
        info!("[DISPATCHER] Started (cooldown scope: {})", self.router.cooldown_scope().as_str());
        let forwarder = self.forwarder.take().map(|f| tokio::spawn(f.run()));

        while let Some(submission) = self.receiver.recv().await {
            let decision = self.router.submit(&submission.intent);
            self.after_decision(&submission.intent, &decision);

            // 提交方可能已放弃等待，忽略
            let _ = submission.reply.send(decision);
        }

        info!("[DISPATCHER] All handles dropped, stopping");

        // 关闭积压队列，转发任务发完剩余 Action 后退出
        drop(self);
        if let Some(forwarder) = forwarder {
            if let Err(e) = forwarder.await {
                warn!("[DISPATCHER] Action forwarder failed: {}", e);
            }
        }
    }

    fn after_decision(&self, intent: &Intent, decision: &RouteDecision) {
        let stats = self.router.stats();
        metrics::record_cooldown_entries(stats.cooldown_entries);
        *self.stats.write() = stats;

        match decision {
            Ok(action) => {
                self.history.push(HistoryRecord {
                    source: action.source,
                    intent_id: action.intent_id.clone(),
                    status: "accepted".to_string(),
                    message: action.confirmation_text.clone(),
                    at: Utc::now(),
                });
                self.event_bus.publish(RoutingEvent::Accepted {
                    action: action.clone(),
                });
                self.forward(action.clone());
            }
            Err(rejection) => {
                self.history.push(HistoryRecord {
                    source: intent.source(),
                    intent_id: intent.intent_id().to_string(),
                    status: rejection.reason_code().to_string(),
                    message: rejection.to_string(),
                    at: Utc::now(),
                });
                self.event_bus.publish(RoutingEvent::Rejected {
                    source: intent.source(),
                    intent_id: intent.intent_id().to_string(),
                    rejection: rejection.clone(),
                });
            }
        }
    }

    /// 按接受顺序放入积压队列，分发循环不等待执行器
    fn forward(&self, action: Action) {
        let Some(backlog) = &self.actions else {
            return;
        };

        if let Err(e) = backlog.send(action) {
            warn!("[DISPATCHER] Action forwarder stopped, dropping action {}", e.0.action_id);
        }
    }
}

/// 把积压的 Action 逐个送入执行器队列
///
/// 只有这一个任务写执行器队列，执行器看到的顺序就是路由器接受的顺序；
/// 执行器队列满时在这里等待，而不是在分发循环里。
struct ActionForwarder {
    backlog: mpsc::UnboundedReceiver<Action>,
    sink: mpsc::Sender<Action>,
}

impl ActionForwarder {
    async fn run(mut self) {
        while let Some(action) = self.backlog.recv().await {
            let action_id = action.action_id;
            if self.sink.send(action).await.is_err() {
                warn!("[DISPATCHER] Executor queue closed, dropping action {}", action_id);
                break;
            }
            debug!("[DISPATCHER] Action {} handed to executor", action_id);
        }
    }
}

/// 分发器句柄，可克隆给每个通道监听器
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<Submission>,
    switches: ChannelSwitches,
    event_bus: EventBus,
    history: Arc<IntentHistory>,
    stats: Arc<RwLock<RouterStats>>,
}

impl DispatcherHandle {
    /// 提交意图并等待路由结果
    ///
    /// 外层 `Err` 表示分发器已停止，内层为路由决策。
    pub async fn submit(&self, intent: Intent) -> Result<RouteDecision> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Submission { intent, reply })
            .await
            .map_err(|_| RouterError::ChannelClosed)?;
        response.await.map_err(|_| RouterError::ChannelClosed)
    }

    /// 记录规范化失败（不经过路由器）
    pub fn report_unrecognized(&self, source: Channel, error: &UnrecognizedInputError) {
        metrics::record_input_unrecognized(source);
        self.history.push(HistoryRecord {
            source,
            intent_id: String::new(),
            status: "unrecognized".to_string(),
            message: error.to_string(),
            at: Utc::now(),
        });
        self.event_bus.publish(RoutingEvent::Unrecognized {
            source,
            error: error.to_string(),
        });
    }

    pub fn switches(&self) -> &ChannelSwitches {
        &self.switches
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn history(&self) -> &Arc<IntentHistory> {
        &self.history
    }

    /// 最近一次决策后的统计快照
    pub fn stats(&self) -> RouterStats {
        self.stats.read().clone()
    }

    pub fn shared_stats(&self) -> Arc<RwLock<RouterStats>> {
        Arc::clone(&self.stats)
    }
}

/// 分发器构建器
pub struct IntentDispatcherBuilder {
    router: IntentRouter,
    queue_capacity: usize,
    history_capacity: usize,
    event_bus: Option<EventBus>,
    actions: Option<mpsc::Sender<Action>>,
}

impl IntentDispatcherBuilder {
    pub fn new(router: IntentRouter) -> Self {
        Self {
            router,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_bus: None,
            actions: None,
        }
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// 被接受的 Action 发往执行器队列
    pub fn action_sink(mut self, sender: mpsc::Sender<Action>) -> Self {
        self.actions = Some(sender);
        self
    }

    pub fn build(self) -> (IntentDispatcher, DispatcherHandle) {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let (actions, forwarder) = match self.actions {
            Some(sink) => {
                let (backlog_tx, backlog) = mpsc::unbounded_channel();
                (Some(backlog_tx), Some(ActionForwarder { backlog, sink }))
            }
            None => (None, None),
        };
        let event_bus = self.event_bus.unwrap_or_default();
        let history = Arc::new(IntentHistory::new(self.history_capacity));
        let stats = Arc::new(RwLock::new(self.router.stats()));
        let switches = self.router.switches().clone();

        let handle = DispatcherHandle {
            sender,
            switches,
            event_bus: event_bus.clone(),
            history: Arc::clone(&history),
            stats: Arc::clone(&stats),
        };
        let dispatcher = IntentDispatcher {
            router: self.router,
            receiver,
            actions,
            forwarder,
            event_bus,
            history,
            stats,
        };
        (dispatcher, handle)
    }
}
