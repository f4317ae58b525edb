//! 数据模型模块

// 输入通道
pub mod channel;

// 原始事件与规范化意图
pub mod intent;

// 路由结果
pub mod action;

pub use action::Action;
pub use channel::Channel;
pub use intent::{Intent, RawEvent};
