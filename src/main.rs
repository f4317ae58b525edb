use anyhow::{Context, Result};
use qanat_router::{
    catalog::ActionCatalog,
    cli::{Cli, Commands},
    config::{self, RouterConfig},
    logging, IntentServer,
};
use std::fs;
use std::process;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    let _ = dotenvy::dotenv();

    // 解析命令行参数
    let cli = Cli::parse();

    // 处理子命令
    match &cli.command {
        Some(Commands::GenerateConfig { path }) => return generate_config(path),
        Some(Commands::ValidateConfig { path }) => return validate_config(path),
        Some(Commands::ShowConfig) => return show_config(&cli),
        Some(Commands::ListCommands) => return list_commands(&cli),
        Some(Commands::Run) | None => {}
    }

    // 快速读取配置文件的 [logging] 段（不加载完整配置）
    let early_log = config::load_early_logging_config(cli.config_file.as_deref());

    // 合并日志配置（优先级：CLI > 环境变量 > 配置文件 > 默认值）
    let log_level = cli
        .get_log_level()
        .or_else(|| std::env::var("LOG_LEVEL").ok().map(|l| l.to_lowercase()))
        .or(early_log.level)
        .unwrap_or_else(|| "info".to_string());
    let log_format = cli.get_log_format().or(early_log.format);
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| std::env::var("LOG_FILE").ok())
        .or(early_log.file);

    let _log_guard = logging::init_logging(&log_level, log_format.as_deref(), log_file.as_deref(), cli.quiet)?;

    tracing::info!("🚀 Qanat Router starting...");

    // 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let config = RouterConfig::load(&cli).context("加载配置失败")?;

    if cli.dev {
        tracing::info!("🔧 开发模式已启用");
    }

    tracing::info!("📊 Router Configuration:");
    tracing::info!("  - Catalog Entries: {}", config.catalog.len());
    tracing::info!("  - Cooldown Scope: {}", config.router.cooldown_scope.as_str());
    tracing::info!("  - Log Level: {}", log_level);
    tracing::info!(
        "  - Log Format: {:?}",
        log_format.as_deref().unwrap_or("compact")
    );
    if let Some(f) = &log_file {
        tracing::info!("  - Log File: {}", f);
    }
    if config.metrics.enabled {
        tracing::info!("  - Metrics Port: {}", config.metrics.port);
    }

    // 创建服务（目录校验失败时退出）
    let server = match IntentServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("❌ 服务初始化失败: {}", e);
            tracing::error!("💡 请检查 [[catalog]] 配置后重试");
            process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!("❌ 服务运行失败: {}", e);
        process::exit(1);
    }

    Ok(())
}

/// 生成默认配置文件（包含内置目录）
fn generate_config(path: &str) -> Result<()> {
    let mut content = String::from(
        "# Qanat Router 配置文件\n# 此文件由 qanat-router generate-config 生成\n# 凭据建议通过环境变量提供：SQUARE_API_KEY, ELEVENLABS_API_KEY\n\n",
    );
    content.push_str(&RouterConfig::default().to_toml_string()?);

    fs::write(path, content).with_context(|| format!("无法写入配置文件: {}", path))?;

    println!("✅ 配置文件已生成: {}", path);
    Ok(())
}

/// 验证配置文件与目录
fn validate_config(path: &str) -> Result<()> {
    let config = RouterConfig::from_toml_file(path)
        .with_context(|| format!("配置文件验证失败: {}", path))?;
    let catalog = ActionCatalog::load(&config.catalog)
        .with_context(|| format!("意图目录验证失败: {}", path))?;

    println!("✅ 配置文件有效: {}", path);
    println!("📊 配置摘要:");
    println!("  - Intents: {}", catalog.len());
    println!("  - Cooldown Scope: {}", config.router.cooldown_scope.as_str());
    println!("  - Voice: {}", config.voice.enabled);
    println!("  - Gesture: {}", config.gesture.enabled);

    Ok(())
}

/// 显示最终配置（合并后的配置，隐去密钥）
fn show_config(cli: &Cli) -> Result<()> {
    let _guard = logging::init_logging("info", None, None, cli.quiet)?;

    let config = RouterConfig::load(cli).context("加载配置失败")?;

    println!("📊 最终配置（合并后的配置）:");
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);

    let missing = config.missing_credentials();
    if !missing.is_empty() {
        println!("⚠️ 未配置的凭据: {}", missing.join(", "));
    }

    Ok(())
}

/// 列出语音触发词和手势
fn list_commands(cli: &Cli) -> Result<()> {
    let config = RouterConfig::load(cli).context("加载配置失败")?;
    let catalog = ActionCatalog::load(&config.catalog).context("意图目录无效")?;

    println!("🎯 可用命令:");
    for command in catalog.command_listing() {
        println!(
            "  [{}] {:<20} -> {:<24} {}",
            command.channel, command.trigger, command.intent_id, command.description
        );
    }

    Ok(())
}
