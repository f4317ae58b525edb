//! Action 模型：路由器接受意图后交给执行器的指令

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::channel::Channel;

/// 已解析、可执行的动作
///
/// 每个被接受的 Intent 最多产生一个 Action，执行器恰好消费一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_id: Uuid,
    /// 产生该动作的意图 emission id
    pub emission_id: Uuid,
    pub source: Channel,
    pub intent_id: String,
    /// 目录中配置的执行目标
    pub target: String,
    pub params: BTreeMap<String, String>,
    /// 给用户的确认文案（TTS / toast）
    pub confirmation_text: String,
    pub accepted_at: DateTime<Utc>,
}

impl Action {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
