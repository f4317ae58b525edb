use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::Rejection;
use crate::executor::ExecutionOutcome;
use crate::model::{Action, Channel};

/// 路由事件（供 TTS、toast 等展示层订阅）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoutingEvent {
    Accepted {
        action: Action,
    },
    Rejected {
        source: Channel,
        intent_id: String,
        rejection: Rejection,
    },
    Unrecognized {
        source: Channel,
        error: String,
    },
    Executed {
        outcome: ExecutionOutcome,
    },
}

/// In-process Event Bus（进程内事件总线）
///
/// 基于 tokio::sync::broadcast，慢订阅者会丢失旧事件（Lagged）。
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RoutingEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 发布事件，返回收到事件的订阅者数量；没有订阅者不算错误
    pub fn publish(&self, event: RoutingEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("Routing event dropped: no subscribers");
                0
            }
        }
    }

    /// 订阅事件
    pub fn subscribe(&self) -> broadcast::Receiver<RoutingEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new(8);
        let delivered = bus.publish(RoutingEvent::Unrecognized {
            source: Channel::Voice,
            error: "no match".to_string(),
        });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(RoutingEvent::Rejected {
            source: Channel::Gesture,
            intent_id: "ui.refresh".to_string(),
            rejection: Rejection::ChannelDisabled {
                channel: Channel::Gesture,
            },
        });

        match rx.recv().await.unwrap() {
            RoutingEvent::Rejected { intent_id, .. } => assert_eq!(intent_id, "ui.refresh"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
