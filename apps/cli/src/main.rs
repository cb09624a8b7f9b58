//! # RC Servo CLI
//!
//! Command-line interface for RC servo position control.
//!
//! 所有子命令读取同一个 TOML 配置文件（机器人描述 + `[servo]` 段）：
//!
//! ```bash
//! # 校验配置（不触碰硬件）
//! rcservo-cli --config servo.toml check
//!
//! # 列出关节
//! rcservo-cli --config servo.toml info
//!
//! # 移动到目标位置（dry-run 使用 Mock PWM）
//! rcservo-cli --config servo.toml move --dry-run 0.5
//!
//! # 在关节范围内往复扫动，Ctrl+C 停止
//! rcservo-cli --config servo.toml sweep --chip 0 --cycles 0
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod session;

use commands::{CheckCommand, InfoCommand, MoveCommand, SweepCommand};

/// RC Servo CLI - 舵机命令行工具
#[derive(Parser, Debug)]
#[command(name = "rcservo-cli")]
#[command(about = "Command-line interface for RC servo position control", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true, default_value = "servo.toml")]
    config: PathBuf,

    /// 日志详细程度（-v debug，-vv trace）
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 校验配置并打印标定结果
    Check {
        #[command(flatten)]
        args: CheckCommand,
    },

    /// 列出机器人描述中的关节
    Info {
        #[command(flatten)]
        args: InfoCommand,
    },

    /// 移动舵机到目标位置
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 在关节范围内往复扫动
    Sweep {
        #[command(flatten)]
        args: SweepCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志（RUST_LOG 优先，其次 -v）
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("rcservo={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { args } => args.execute(&cli.config),
        Commands::Info { args } => args.execute(&cli.config),
        Commands::Move { args } => args.execute(&cli.config),
        Commands::Sweep { args } => args.execute(&cli.config),
    }
}
