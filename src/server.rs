use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::ActionCatalog;
use crate::config::RouterConfig;
use crate::dispatcher::{DispatcherHandle, IntentDispatcher, IntentDispatcherBuilder};
use crate::error::{ErrorResponse, Rejection, Result, RouterError};
use crate::executor::{DashboardExecutor, ExecutorWorker};
use crate::infra::{
    metrics, Clock, EventBus, IntentRouter, IntentRouterConfig, MonotonicClock, RoutingEvent,
};
use crate::model::{Action, Channel, RawEvent};
use crate::normalizer::IntentNormalizer;

/// 每条输入的处理结果（标准输出的一行）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
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
    /// 选中项已更新
    Selected {
        item_id: Option<String>,
    },
    /// 通道开关已更新
    Switched {
        channel: Channel,
        enabled: bool,
    },
    /// 输入无法解析
    Invalid {
        error: ErrorResponse,
    },
}

/// 意图路由服务
///
/// 组装目录、规范化器、分发器与执行器；`start()` 之后才能提交事件。
pub struct IntentServer {
    config: RouterConfig,
    normalizer: Arc<IntentNormalizer>,
    handle: DispatcherHandle,
    dispatcher: Option<IntentDispatcher>,
    worker: Option<ExecutorWorker>,
    tasks: Vec<JoinHandle<()>>,
}

impl IntentServer {
    /// 使用单调时钟创建服务
    pub fn new(config: RouterConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: RouterConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        info!("🔧 初始化意图路由组件...");

        let catalog = Arc::new(ActionCatalog::load(&config.catalog)?);
        info!("✅ 意图目录加载完成（{} 个意图）", catalog.len());

        let normalizer = Arc::new(
            IntentNormalizer::new(Arc::clone(&catalog))
                .with_default_voice_confidence(config.voice.default_confidence),
        );

        let router = IntentRouter::with_config(
            Arc::clone(&catalog),
            clock,
            IntentRouterConfig {
                cooldown_scope: config.router.cooldown_scope,
                prune_threshold: config.router.prune_threshold,
            },
        );
        if !config.voice.enabled {
            router.switches().disable(Channel::Voice);
        }
        if !config.gesture.enabled {
            router.switches().disable(Channel::Gesture);
        }

        let event_bus = EventBus::default();
        let (action_tx, action_rx) = mpsc::channel(config.router.executor_queue_capacity.max(1));
        let (dispatcher, handle) = IntentDispatcherBuilder::new(router)
            .queue_capacity(config.router.queue_capacity)
            .history_capacity(config.router.history_capacity)
            .event_bus(event_bus.clone())
            .action_sink(action_tx)
            .build();
        info!("✅ IntentDispatcher 创建完成");

        let executor = DashboardExecutor::new(catalog).with_stats(handle.shared_stats());
        let worker = ExecutorWorker::new(action_rx, Arc::new(executor), event_bus);
        info!("✅ ExecutorWorker 创建完成");

        Ok(Self {
            config,
            normalizer,
            handle,
            dispatcher: Some(dispatcher),
            worker: Some(worker),
            tasks: Vec::new(),
        })
    }

    /// 启动分发器和执行器后台任务（重复调用无效果）
    pub fn start(&mut self) {
        if let Some(dispatcher) = self.dispatcher.take() {
            self.tasks.push(tokio::spawn(dispatcher.run()));
            info!("✅ IntentDispatcher 后台任务已启动");
        }
        if let Some(worker) = self.worker.take() {
            self.tasks.push(tokio::spawn(worker.start()));
            info!("✅ ExecutorWorker 后台任务已启动");
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn handle(&self) -> &DispatcherHandle {
        &self.handle
    }

    pub fn normalizer(&self) -> &Arc<IntentNormalizer> {
        &self.normalizer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoutingEvent> {
        self.handle.event_bus().subscribe()
    }

    /// 规范化并提交一个原始通道事件
    pub async fn handle_raw(&self, event: RawEvent) -> Result<RouteOutcome> {
        let source = event.channel();
        let intent = match self.normalizer.normalize(&event) {
            Ok(intent) => intent,
            Err(e) => {
                debug!("Unrecognized {} input: {}", source, e);
                self.handle.report_unrecognized(source, &e);
                return Ok(RouteOutcome::Unrecognized {
                    source,
                    error: e.to_string(),
                });
            }
        };

        let intent_id = intent.intent_id().to_string();
        let outcome = match self.handle.submit(intent).await? {
            Ok(action) => RouteOutcome::Accepted { action },
            Err(rejection) => RouteOutcome::Rejected {
                source,
                intent_id,
                rejection,
            },
        };
        Ok(outcome)
    }

    /// 处理一行 JSON 输入
    pub async fn handle_line(&self, line: &str) -> Result<RouteOutcome> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => return Ok(invalid(RouterError::Serialization(e))),
        };

        match value.get("channel").and_then(Value::as_str) {
            Some("select") => {
                let item_id = value.get("item_id").and_then(Value::as_str).map(str::to_string);
                self.normalizer.set_selected_item(item_id);
                Ok(RouteOutcome::Selected {
                    item_id: self.normalizer.selected_item(),
                })
            }
            Some("switch") => {
                let channel = value.get("name").and_then(Value::as_str).and_then(Channel::from_str);
                let enabled = value.get("enabled").and_then(Value::as_bool);
                match (channel, enabled) {
                    (Some(channel), Some(enabled)) => {
                        self.handle.switches().set_enabled(channel, enabled);
                        Ok(RouteOutcome::Switched { channel, enabled })
                    }
                    _ => Ok(invalid(RouterError::InvalidInput(
                        "switch requires a channel name and enabled flag".to_string(),
                    ))),
                }
            }
            _ => match serde_json::from_value::<RawEvent>(value) {
                Ok(event) => self.handle_raw(event).await,
                Err(e) => Ok(invalid(RouterError::Serialization(e))),
            },
        }
    }

    /// 运行服务：从标准输入逐行读取事件，结果逐行写到标准输出，Ctrl-C 或输入结束时退出
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("🚀 启动意图路由主循环...");
        self.show_config_info();

        if self.config.metrics.enabled {
            let addr = SocketAddr::from(([0, 0, 0, 0], self.config.metrics.port));
            match metrics::init(addr) {
                Ok(()) => info!("📈 Prometheus 指标已启用: http://{}/metrics", addr),
                Err(e) => warn!("⚠️ 指标初始化失败: {}", e),
            }
        }

        self.start();
        let printer = spawn_execution_printer(self.subscribe());
        self.tasks.push(printer);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        info!("📭 输入结束");
                        break;
                    };
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let outcome = match self.handle_line(line).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("❌ 处理输入失败: {}", e);
                            invalid(e)
                        }
                    };
                    let mut json = serde_json::to_string(&outcome)?;
                    json.push('\n');
                    stdout.write_all(json.as_bytes()).await?;
                    stdout.flush().await?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("🛑 收到退出信号");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// 关闭输入端并等待已接受的动作执行完毕
    async fn shutdown(self) {
        let IntentServer { handle, tasks, .. } = self;
        // 句柄释放后分发器退出，执行器处理完队列后退出，输出任务随事件总线关闭
        drop(handle);
        for task in tasks {
            if let Err(e) = task.await {
                warn!("⚠️ 后台任务异常退出: {}", e);
            }
        }
        info!("👋 服务已退出");
    }

    /// 显示配置信息
    fn show_config_info(&self) {
        info!("📊 路由配置信息:");
        info!("  - 冷却作用域: {}", self.config.router.cooldown_scope.as_str());
        info!("  - 提交队列容量: {}", self.config.router.queue_capacity);
        info!("  - 历史记录容量: {}", self.config.router.history_capacity);
        info!("  - 语音通道: {}", enabled_label(self.config.voice.enabled));
        info!("  - 手势通道: {}", enabled_label(self.config.gesture.enabled));
        info!("  - 商品服务环境: {}", self.config.commerce.environment);

        let missing = self.config.missing_credentials();
        if !missing.is_empty() {
            warn!("⚠️ 缺少服务凭据（不影响路由）: {}", missing.join(", "));
        }
    }
}

fn invalid(error: RouterError) -> RouteOutcome {
    RouteOutcome::Invalid {
        error: ErrorResponse::new(&error),
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// 把执行结果逐行写到标准输出
fn spawn_execution_printer(mut events: broadcast::Receiver<RoutingEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event @ RoutingEvent::Executed { .. }) => match serde_json::to_string(&event) {
                    Ok(json) => println!("{}", json),
                    Err(e) => warn!("Failed to serialize execution outcome: {}", e),
                },
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Execution printer lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::infra::ManualClock;

    fn server() -> (IntentServer, ManualClock) {
        let clock = ManualClock::new();
        let mut server = IntentServer::with_clock(RouterConfig::default(), Arc::new(clock.clone())).unwrap();
        server.start();
        (server, clock)
    }

    #[tokio::test]
    async fn test_voice_line_accepted() {
        let (server, _) = server();
        let outcome = server
            .handle_line(r#"{"channel":"voice","transcript":"Please show orders now","confidence":0.9}"#)
            .await
            .unwrap();
        match outcome {
            RouteOutcome::Accepted { action } => assert_eq!(action.intent_id, "orders.view"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selection_feeds_gesture_params() {
        let (server, _) = server();
        server
            .handle_line(r#"{"channel":"select","item_id":"ITEM_7"}"#)
            .await
            .unwrap();
        let outcome = server
            .handle_line(r#"{"channel":"gesture","label":"thumb_up","confidence":0.92}"#)
            .await
            .unwrap();
        match outcome {
            RouteOutcome::Accepted { action } => {
                assert_eq!(action.param("item_id"), Some("ITEM_7"));
                assert_eq!(action.confirmation_text, "Toggling status for item ITEM_7");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unrecognized_and_invalid_lines() {
        let (server, _) = server();
        let outcome = server
            .handle_line(r#"{"channel":"voice","transcript":"asdf qwer"}"#)
            .await
            .unwrap();
        assert!(matches!(outcome, RouteOutcome::Unrecognized { source: Channel::Voice, .. }));

        let outcome = server.handle_line("not json").await.unwrap();
        assert!(matches!(outcome, RouteOutcome::Invalid { .. }));
    }

    #[tokio::test]
    async fn test_switch_line_disables_channel() {
        let (server, _) = server();
        let outcome = server
            .handle_line(r#"{"channel":"switch","name":"gesture","enabled":false}"#)
            .await
            .unwrap();
        assert!(matches!(outcome, RouteOutcome::Switched { enabled: false, .. }));

        let outcome = server
            .handle_line(r#"{"channel":"gesture","label":"open_palm","confidence":0.95}"#)
            .await
            .unwrap();
        match outcome {
            RouteOutcome::Rejected { rejection, .. } => assert_eq!(rejection.reason_code(), "channel_disabled"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_switch_line_is_invalid_input() {
        let (server, _) = server();
        let outcome = server
            .handle_line(r#"{"channel":"switch","name":"smell","enabled":true}"#)
            .await
            .unwrap();
        match outcome {
            RouteOutcome::Invalid { error } => assert_eq!(error.code, ErrorCode::InvalidInput),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(server.handle().switches().is_enabled(Channel::Gesture));
    }

    #[tokio::test]
    async fn test_disabled_voice_from_config() {
        let mut config = RouterConfig::default();
        config.voice.enabled = false;
        let mut server = IntentServer::with_clock(config, Arc::new(ManualClock::new())).unwrap();
        server.start();

        let outcome = server
            .handle_raw(RawEvent::Voice {
                transcript: "help".to_string(),
                confidence: Some(0.9),
            })
            .await
            .unwrap();
        assert!(matches!(outcome, RouteOutcome::Rejected { .. }));
    }
}
