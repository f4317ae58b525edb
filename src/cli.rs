use clap::{Parser, Subcommand};

// 确保 Parser trait 被使用
impl Cli {
    /// 解析命令行参数
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

/// Qanat Router - 多模态意图路由服务
#[derive(Parser, Debug, Default)]
#[command(name = "qanat-router")]
#[command(version)]
#[command(about = "把界面、语音、手势输入仲裁为卖家后台动作", long_about = None)]
pub struct Cli {
    /// 配置文件路径
    #[arg(long, value_name = "FILE", help = "指定配置文件路径（默认 ./qanat.toml）")]
    pub config_file: Option<String>,

    /// 日志级别
    #[arg(
        long,
        value_name = "LEVEL",
        help = "日志级别: trace, debug, info, warn, error"
    )]
    pub log_level: Option<String>,

    /// 日志格式
    #[arg(long, value_name = "FORMAT", help = "日志格式: pretty, json, compact")]
    pub log_format: Option<String>,

    /// 日志文件路径
    #[arg(long, value_name = "PATH", help = "日志输出文件路径（按天滚动）")]
    pub log_file: Option<String>,

    /// 冷却作用域
    #[arg(long, value_name = "SCOPE", help = "冷却作用域: per_channel, global")]
    pub cooldown_scope: Option<String>,

    /// 关闭语音通道
    #[arg(long, help = "启动时关闭语音通道")]
    pub disable_voice: bool,

    /// 关闭手势通道
    #[arg(long, help = "启动时关闭手势通道")]
    pub disable_gesture: bool,

    /// 启用监控指标
    #[arg(long, help = "启用 Prometheus 监控指标")]
    pub enable_metrics: bool,

    /// 监控端口
    #[arg(long, value_name = "PORT", help = "监控指标服务端口（默认 9090）")]
    pub metrics_port: Option<u16>,

    /// 详细输出（可重复使用：-v, -vv, -vvv）
    #[arg(short, action = clap::ArgAction::Count, help = "详细输出级别")]
    pub verbose: u8,

    /// 静默模式
    #[arg(long, short = 'q', help = "静默模式（只输出错误）")]
    pub quiet: bool,

    /// 开发模式（等同于 --log-level debug --log-format pretty）
    #[arg(long, help = "启用开发模式")]
    pub dev: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// 启动服务，从标准输入读取 JSON 行事件（默认）
    Run,
    /// 生成默认配置文件
    GenerateConfig {
        /// 输出文件路径
        #[arg(value_name = "PATH", default_value = "qanat.toml")]
        path: String,
    },
    /// 验证配置文件与意图目录
    ValidateConfig {
        /// 配置文件路径
        #[arg(value_name = "PATH", default_value = "qanat.toml")]
        path: String,
    },
    /// 显示最终配置（合并后的配置，隐去密钥）
    ShowConfig,
    /// 列出所有语音触发词和手势
    ListCommands,
}

impl Cli {
    /// 获取日志级别（考虑 verbose 和 quiet）
    pub fn get_log_level(&self) -> Option<String> {
        if self.quiet {
            return Some("error".to_string());
        }

        if self.dev {
            return Some("debug".to_string());
        }

        if let Some(level) = &self.log_level {
            return Some(level.clone());
        }

        // 根据 verbose 级别设置
        match self.verbose {
            0 => None, // 使用默认或配置文件
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        }
    }

    /// 获取日志格式
    pub fn get_log_format(&self) -> Option<String> {
        if self.dev {
            return Some("pretty".to_string());
        }
        self.log_format.clone()
    }
}
