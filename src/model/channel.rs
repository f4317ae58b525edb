//! 输入通道模型

use std::fmt;

use serde::{Deserialize, Serialize};

/// 输入通道（产生 Intent 的交互方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// 界面点击（按钮、表格行操作）
    Ui,
    /// 语音转写
    Voice,
    /// 手势识别
    Gesture,
}

impl Channel {
    /// 全部通道，按固定顺序
    pub const ALL: [Channel; 3] = [Channel::Ui, Channel::Voice, Channel::Gesture];

    /// 从字符串转换
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ui" | "click" => Some(Channel::Ui),
            "voice" | "speech" => Some(Channel::Voice),
            "gesture" => Some(Channel::Gesture),
            _ => None,
        }
    }

    /// 转换为字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Ui => "ui",
            Channel::Voice => "voice",
            Channel::Gesture => "gesture",
        }
    }

    /// 置信度是否来自外部分类器（UI 事件恒为 1.0）
    pub fn is_classified(&self) -> bool {
        !matches!(self, Channel::Ui)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Channel::Ui => 0,
            Channel::Voice => 1,
            Channel::Gesture => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_str(channel.as_str()), Some(channel));
        }
        assert_eq!(Channel::from_str(" Voice "), Some(Channel::Voice));
        assert_eq!(Channel::from_str("keyboard"), None);
        assert!(!Channel::Ui.is_classified());
        assert!(Channel::Gesture.is_classified());
    }
}
