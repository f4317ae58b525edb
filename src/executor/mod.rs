//! Action Executor 边界
//!
//! 路由器只负责产出 `Action`；调用商品/订单接口并生成界面更新由执行器完成。
//! 执行在独立的 worker 中进行，路由器从不等待执行结果。

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Action, Channel};

pub mod dashboard;
pub mod worker;

pub use dashboard::DashboardExecutor;
pub use worker::ExecutorWorker;

/// 执行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Error => "error",
        }
    }
}

/// 执行结果（用于构建界面更新）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    pub action_id: Uuid,
    pub intent_id: String,
    pub source: Channel,
    pub status: ExecutionStatus,
    /// 执行目标
    pub action: String,
    pub message: String,
    /// 是否需要刷新界面
    pub ui_update: bool,
    pub data: Value,
}

impl ExecutionOutcome {
    pub fn success(action: &Action, message: impl Into<String>, ui_update: bool, data: Value) -> Self {
        Self {
            action_id: action.action_id,
            intent_id: action.intent_id.clone(),
            source: action.source,
            status: ExecutionStatus::Success,
            action: action.target.clone(),
            message: message.into(),
            ui_update,
            data,
        }
    }

    pub fn error(action: &Action, message: impl Into<String>) -> Self {
        Self {
            action_id: action.action_id,
            intent_id: action.intent_id.clone(),
            source: action.source,
            status: ExecutionStatus::Error,
            action: action.target.clone(),
            message: message.into(),
            ui_update: false,
            data: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Action Executor Trait（执行器接口）
///
/// 必须接受路由器能为其声明的目录条目产出的每一个 `Action`。
/// 业务层面的失败（缺参数等）返回 `ExecutionStatus::Error`，`Err` 只用于基础设施故障。
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &Action) -> Result<ExecutionOutcome>;
}
