use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{default_catalog, CatalogEntryConfig};
use crate::infra::{CooldownScope, DEFAULT_HISTORY_CAPACITY};

/// 未指定 `--config-file` 时尝试加载的文件
pub const DEFAULT_CONFIG_FILE: &str = "qanat.toml";

const REDACTED: &str = "***";

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// 路由器参数
    pub router: RouterSection,
    /// 商品/订单服务凭据
    pub commerce: CommerceConfig,
    /// 语音通道
    pub voice: VoiceConfig,
    /// 手势通道
    pub gesture: GestureConfig,
    /// 日志
    pub logging: LoggingConfig,
    /// 监控指标
    pub metrics: MetricsConfig,
    /// 意图目录
    pub catalog: Vec<CatalogEntryConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            router: RouterSection::default(),
            commerce: CommerceConfig::default(),
            voice: VoiceConfig::default(),
            gesture: GestureConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            catalog: default_catalog(),
        }
    }
}

/// `[router]` 段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSection {
    pub cooldown_scope: CooldownScope,
    /// 提交队列容量
    pub queue_capacity: usize,
    /// 执行器队列容量
    pub executor_queue_capacity: usize,
    /// 冷却记录超过该数量时清理过期项
    pub prune_threshold: usize,
    /// 保留的最近决策条数
    pub history_capacity: usize,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            cooldown_scope: CooldownScope::PerChannel,
            queue_capacity: 256,
            executor_queue_capacity: 256,
            prune_threshold: 1024,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// `[commerce]` 段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommerceConfig {
    pub api_key: Option<String>,
    /// sandbox / production
    pub environment: String,
    pub application_id: Option<String>,
    pub mcp_host: String,
    pub mcp_port: u16,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: "sandbox".to_string(),
            application_id: None,
            mcp_host: "localhost".to_string(),
            mcp_port: 3001,
        }
    }
}

/// `[voice]` 段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub voice_id: String,
    /// 转写结果未带置信度时使用
    pub default_confidence: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            voice_id: "pNInz6obpgDQGcFmaJgB".to_string(),
            default_confidence: 1.0,
        }
    }
}

/// `[gesture]` 段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    pub enabled: bool,
    pub model_path: String,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: "./models/".to_string(),
        }
    }
}

/// `[logging]` 段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<String>,
}

/// 监控指标（仅命令行控制）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

impl RouterConfig {
    /// 从 TOML 文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;
        Self::from_toml_str(&content)
    }

    /// 从 TOML 文本加载配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content).with_context(|| "配置文件格式错误")?;
        Ok(toml_config.into())
    }

    /// 生成 TOML 文本（包含完整目录）
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("配置序列化失败")
    }

    /// 从环境变量合并配置
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| env::var(key).ok());
        Ok(())
    }

    fn merge_from_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // 商品/订单服务
        if let Some(key) = lookup("SQUARE_API_KEY") {
            self.commerce.api_key = Some(key);
        }
        if let Some(environment) = lookup("SQUARE_ENVIRONMENT") {
            self.commerce.environment = environment;
        }
        if let Some(app_id) = lookup("SQUARE_APPLICATION_ID") {
            self.commerce.application_id = Some(app_id);
        }
        if let Some(host) = lookup("MCP_SERVER_HOST") {
            self.commerce.mcp_host = host;
        }
        if let Some(port) = lookup("MCP_SERVER_PORT") {
            self.commerce.mcp_port = port.parse().unwrap_or(self.commerce.mcp_port);
        }

        // 语音
        if let Some(key) = lookup("ELEVENLABS_API_KEY") {
            self.voice.api_key = Some(key);
        }
        if let Some(voice_id) = lookup("ELEVENLABS_VOICE_ID") {
            self.voice.voice_id = voice_id;
        }

        // 手势
        if let Some(path) = lookup("MEDIAPIPE_MODEL_PATH") {
            self.gesture.model_path = path;
        }

        // 日志
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = Some(level.to_lowercase());
        }
        if let Some(file) = lookup("LOG_FILE") {
            self.logging.file = Some(file);
        }

        if let Some(scope) = lookup("QANAT_COOLDOWN_SCOPE") {
            match CooldownScope::from_str(&scope) {
                Some(scope) => self.router.cooldown_scope = scope,
                None => warn!("未知的冷却作用域: {}，保留 {}", scope, self.router.cooldown_scope.as_str()),
            }
        }
    }

    /// 从命令行参数合并配置
    pub fn merge_from_cli(&mut self, cli: &crate::cli::Cli) -> Result<()> {
        if let Some(scope) = &cli.cooldown_scope {
            self.router.cooldown_scope = CooldownScope::from_str(scope)
                .with_context(|| format!("未知的冷却作用域: {}", scope))?;
        }
        if cli.disable_voice {
            self.voice.enabled = false;
        }
        if cli.disable_gesture {
            self.gesture.enabled = false;
        }
        if cli.enable_metrics {
            self.metrics.enabled = true;
        }
        if let Some(port) = cli.metrics_port {
            self.metrics.port = port;
        }
        if let Some(level) = cli.get_log_level() {
            self.logging.level = Some(level);
        }
        if let Some(format) = cli.get_log_format() {
            self.logging.format = Some(format);
        }
        if let Some(file) = &cli.log_file {
            self.logging.file = Some(file.clone());
        }
        Ok(())
    }

    /// 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    pub fn load(cli: &crate::cli::Cli) -> Result<Self> {
        // 1. 配置文件（如果存在），否则默认值
        let mut config = match &cli.config_file {
            Some(config_file) if Path::new(config_file).exists() => {
                info!("📄 从配置文件加载: {}", config_file);
                Self::from_toml_file(config_file)?
            }
            Some(config_file) => {
                warn!("⚠️ 配置文件不存在: {}", config_file);
                Self::default()
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("📄 从默认配置文件加载: {}", DEFAULT_CONFIG_FILE);
                Self::from_toml_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        // 2. 环境变量
        config.merge_from_env()?;

        // 3. 命令行参数
        config.merge_from_cli(cli)?;

        Ok(config)
    }

    /// 缺失的服务凭据（路由本身不需要，仅用于提示）
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.commerce.api_key) {
            missing.push("SQUARE_API_KEY");
        }
        if is_blank(&self.commerce.application_id) {
            missing.push("SQUARE_APPLICATION_ID");
        }
        if self.voice.enabled && is_blank(&self.voice.api_key) {
            missing.push("ELEVENLABS_API_KEY");
        }
        missing
    }

    /// 隐去密钥后的副本（用于 show-config）
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.commerce.api_key.is_some() {
            config.commerce.api_key = Some(REDACTED.to_string());
        }
        if config.voice.api_key.is_some() {
            config.voice.api_key = Some(REDACTED.to_string());
        }
        config
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// 快速读取 `[logging]` 段，日志系统初始化之前使用；读取失败时返回空配置
pub fn load_early_logging_config(config_file: Option<&str>) -> LoggingConfig {
    let path = config_file.unwrap_or(DEFAULT_CONFIG_FILE);
    let Ok(content) = fs::read_to_string(path) else {
        return LoggingConfig::default();
    };

    #[derive(Deserialize)]
    struct EarlyConfig {
        logging: Option<LoggingConfig>,
    }

    toml::from_str::<EarlyConfig>(&content)
        .ok()
        .and_then(|c| c.logging)
        .unwrap_or_default()
}

/// TOML 配置文件结构（用于反序列化）
#[derive(Debug, Deserialize)]
struct TomlConfig {
    router: Option<TomlRouterConfig>,
    commerce: Option<TomlCommerceConfig>,
    voice: Option<TomlVoiceConfig>,
    gesture: Option<TomlGestureConfig>,
    logging: Option<LoggingConfig>,
    catalog: Option<Vec<CatalogEntryConfig>>,
}

#[derive(Debug, Deserialize)]
struct TomlRouterConfig {
    cooldown_scope: Option<CooldownScope>,
    queue_capacity: Option<usize>,
    executor_queue_capacity: Option<usize>,
    prune_threshold: Option<usize>,
    history_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TomlCommerceConfig {
    api_key: Option<String>,
    environment: Option<String>,
    application_id: Option<String>,
    mcp_host: Option<String>,
    mcp_port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct TomlVoiceConfig {
    enabled: Option<bool>,
    api_key: Option<String>,
    voice_id: Option<String>,
    default_confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TomlGestureConfig {
    enabled: Option<bool>,
    model_path: Option<String>,
}

impl From<TomlConfig> for RouterConfig {
    fn from(toml: TomlConfig) -> Self {
        let mut config = Self::default();

        if let Some(router) = toml.router {
            if let Some(scope) = router.cooldown_scope {
                config.router.cooldown_scope = scope;
            }
            if let Some(capacity) = router.queue_capacity {
                config.router.queue_capacity = capacity;
            }
            if let Some(capacity) = router.executor_queue_capacity {
                config.router.executor_queue_capacity = capacity;
            }
            if let Some(threshold) = router.prune_threshold {
                config.router.prune_threshold = threshold;
            }
            if let Some(capacity) = router.history_capacity {
                config.router.history_capacity = capacity;
            }
        }

        if let Some(commerce) = toml.commerce {
            if commerce.api_key.is_some() {
                config.commerce.api_key = commerce.api_key;
            }
            if let Some(environment) = commerce.environment {
                config.commerce.environment = environment;
            }
            if commerce.application_id.is_some() {
                config.commerce.application_id = commerce.application_id;
            }
            if let Some(host) = commerce.mcp_host {
                config.commerce.mcp_host = host;
            }
            if let Some(port) = commerce.mcp_port {
                config.commerce.mcp_port = port;
            }
        }

        if let Some(voice) = toml.voice {
            if let Some(enabled) = voice.enabled {
                config.voice.enabled = enabled;
            }
            if voice.api_key.is_some() {
                config.voice.api_key = voice.api_key;
            }
            if let Some(voice_id) = voice.voice_id {
                config.voice.voice_id = voice_id;
            }
            if let Some(confidence) = voice.default_confidence {
                config.voice.default_confidence = confidence;
            }
        }

        if let Some(gesture) = toml.gesture {
            if let Some(enabled) = gesture.enabled {
                config.gesture.enabled = enabled;
            }
            if let Some(path) = gesture.model_path {
                config.gesture.model_path = path;
            }
        }

        if let Some(logging) = toml.logging {
            config.logging = logging;
        }

        // 没有 [[catalog]] 时使用内置目录
        if let Some(catalog) = toml.catalog {
            if !catalog.is_empty() {
                config.catalog = catalog;
            }
        }

        config
    }
}
