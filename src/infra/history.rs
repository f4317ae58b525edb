//! 最近的路由决策记录（有界环形缓冲）

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::model::Channel;

/// 默认保留条数
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRecord {
    pub source: Channel,
    pub intent_id: String,
    /// `accepted` 或拒绝原因代码
    pub status: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct IntentHistory {
    capacity: usize,
    records: Mutex<VecDeque<HistoryRecord>>,
}

impl IntentHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, record: HistoryRecord) {
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// 最近 `limit` 条，按时间先后排列
    pub fn recent(&self, limit: usize) -> Vec<HistoryRecord> {
        let records = self.records.lock();
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Default for IntentHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
