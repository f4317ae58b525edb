/// 冷却 / 去抖跟踪器
///
/// 核心特性：
/// 1. 按 (通道, intent id) 记录最近一次触发时间
/// 2. 只在路由器确认接受后才写入，失败的尝试不占用冷却窗口
/// 3. 惰性清理：超过最长冷却时间的记录可以丢弃

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::model::Channel;

/// 冷却键
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CooldownKey {
    /// `None` 表示跨通道共享（global 作用域）
    pub channel: Option<Channel>,
    /// intent id 或手势标签
    pub scope: String,
}

impl CooldownKey {
    /// 按通道隔离的键
    pub fn per_channel(channel: Channel, scope: impl Into<String>) -> Self {
        Self {
            channel: Some(channel),
            scope: scope.into(),
        }
    }

    /// 跨通道共享的键
    pub fn global(scope: impl Into<String>) -> Self {
        Self {
            channel: None,
            scope: scope.into(),
        }
    }
}

impl fmt::Display for CooldownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Some(channel) => write!(f, "{}:{}", channel, self.scope),
            None => write!(f, "*:{}", self.scope),
        }
    }
}

/// 冷却跟踪器（非线程安全，由单一仲裁者持有）
#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_fired: HashMap<CooldownKey, Duration>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `now` 距上一次 `record` 不少于 `cooldown`，或没有记录时返回 true
    pub fn allow(&self, key: &CooldownKey, now: Duration, cooldown: Duration) -> bool {
        self.remaining(key, now, cooldown).is_zero()
    }

    /// 剩余冷却时间，可以触发时为 0
    pub fn remaining(&self, key: &CooldownKey, now: Duration, cooldown: Duration) -> Duration {
        match self.last_fired.get(key) {
            Some(&last) => cooldown.saturating_sub(now.saturating_sub(last)),
            None => Duration::ZERO,
        }
    }

    /// 记录一次触发
    pub fn record(&mut self, key: CooldownKey, now: Duration) {
        self.last_fired.insert(key, now);
    }

    /// 最近一次触发时间
    pub fn last_fired(&self, key: &CooldownKey) -> Option<Duration> {
        self.last_fired.get(key).copied()
    }

    /// 丢弃早于 `horizon` 的记录，返回清理数量
    pub fn prune(&mut self, now: Duration, horizon: Duration) -> usize {
        let before = self.last_fired.len();
        self.last_fired
            .retain(|_, &mut last| now.saturating_sub(last) < horizon);
        before - self.last_fired.len()
    }

    pub fn len(&self) -> usize {
        self.last_fired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_fired.is_empty()
    }
}
