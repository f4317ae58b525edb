// Infrastructure layer - 基础设施层
// 负责路由器的基础服务：时钟、冷却记录、通道开关、事件总线、历史与指标

pub mod channel_switches;
pub mod clock;
pub mod cooldown;
pub mod event_bus;
pub mod history;
pub mod intent_router;
pub mod metrics;

// 重新导出主要类型
pub use channel_switches::ChannelSwitches;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use cooldown::{CooldownKey, CooldownTracker};
pub use event_bus::{EventBus, RoutingEvent};
pub use history::{HistoryRecord, IntentHistory, DEFAULT_HISTORY_CAPACITY};
pub use intent_router::{CooldownScope, IntentRouter, IntentRouterConfig, RouteDecision, RouterStats};
