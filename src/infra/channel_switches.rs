use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::model::Channel;

/// 运行时通道开关
///
/// 克隆体共享状态；关闭通道只会拒绝之后的提交，不存在需要取消的在途任务。
#[derive(Debug, Clone)]
pub struct ChannelSwitches {
    enabled: Arc<[AtomicBool; 3]>,
}

impl ChannelSwitches {
    /// 默认全部开启
    pub fn new() -> Self {
        Self {
            enabled: Arc::new([
                AtomicBool::new(true),
                AtomicBool::new(true),
                AtomicBool::new(true),
            ]),
        }
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.enabled[channel.index()].load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, channel: Channel, enabled: bool) {
        let previous = self.enabled[channel.index()].swap(enabled, Ordering::AcqRel);
        if previous != enabled {
            info!("Channel {} {}", channel, if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn enable(&self, channel: Channel) {
        self.set_enabled(channel, true);
    }

    pub fn disable(&self, channel: Channel) {
        self.set_enabled(channel, false);
    }
}

impl Default for ChannelSwitches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switches_are_shared() {
        let switches = ChannelSwitches::new();
        let handle = switches.clone();
        assert!(switches.is_enabled(Channel::Gesture));

        handle.disable(Channel::Gesture);
        assert!(!switches.is_enabled(Channel::Gesture));
        assert!(switches.is_enabled(Channel::Voice));

        switches.enable(Channel::Gesture);
        assert!(handle.is_enabled(Channel::Gesture));
    }
}
