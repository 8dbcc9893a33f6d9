//! PhishBot CLI
//!
//! 从 stdin 或文件读取一次 webhook body，分类并发送通知。

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phishbot::notification::{classify_envelope, NotificationBuilder};
use phishbot::{parse_envelope, DispatchReport, NotifyError, SendResult, Settings};
use tracing::{debug, error};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "phishbot")]
#[command(about = "PhishBot - 将钓鱼演练事件转发到 Slack 和邮件")]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/phishbot/config.json）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 处理一次 webhook 并发送通知
    Notify {
        /// webhook body 文件（默认读取 stdin）
        #[arg(long, short)]
        file: Option<PathBuf>,
        /// Dry-run 模式（只渲染不发送）
        #[arg(long)]
        dry_run: bool,
    },
    /// 只分类事件，输出 JSON
    Classify {
        /// webhook body 文件（默认读取 stdin）
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
}

fn read_body(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => fs::read(path).with_context(|| format!("无法读取 {}", path.display())),
        None => {
            let mut body = Vec::new();
            std::io::stdin()
                .read_to_end(&mut body)
                .context("无法读取 stdin")?;
            Ok(body)
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => Settings::load(path)?,
        None => Settings::load_default()?,
    };
    Ok(settings)
}

fn describe(result: &Result<SendResult, NotifyError>) -> String {
    match result {
        Ok(SendResult::Sent) => "sent".to_string(),
        Ok(SendResult::Skipped(reason)) => format!("skipped ({})", reason),
        Err(e) => format!("failed ({})", e),
    }
}

fn print_report(report: &DispatchReport) {
    let kind = report
        .event
        .kind()
        .map(|k| format!("{:?}", k))
        .unwrap_or_else(|| "Unknown".to_string());
    println!("event: {}", kind);
    println!("  chat:  {}", describe(&report.chat));
    println!("  email: {}", describe(&report.email));
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug phishbot notify -f event.json
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("phishbot=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Notify { file, dry_run } => {
            let settings = load_settings(cli.config.as_deref())?;
            let body = read_body(file.as_deref())?;
            debug!(bytes = body.len(), "Read webhook body");

            let dispatcher = NotificationBuilder::new(settings)
                .dry_run(dry_run)
                .build()
                .context("无法初始化通知渠道")?;

            let envelope = parse_envelope(&body)?;
            let event = classify_envelope(&envelope)?;

            if dry_run {
                let rendered = dispatcher.render(&event);
                println!("{}", serde_json::to_string_pretty(&rendered.chat)?);
                match rendered.email {
                    Ok(email) => println!("{}", serde_json::to_string_pretty(&email)?),
                    Err(e) => eprintln!("email: {}", e),
                }
            }

            let report = dispatcher.dispatch_event(event).await;
            print_report(&report);

            if !report.is_ok() {
                error!("One or more notification channels failed");
                std::process::exit(1);
            }
        }
        Commands::Classify { file } => {
            let body = read_body(file.as_deref())?;
            let envelope = parse_envelope(&body)?;
            let event = classify_envelope(&envelope)?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    Ok(())
}
