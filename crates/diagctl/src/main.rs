/// diagctl - 诊断命令行工具
///
/// 执行一次认证诊断会话并打印结果

use clap::{Parser, Subcommand};
use common::diag_rpc::{run_session, DiagnosticResult};
use common::utils::snapshot_file_name_now;
use common::FunctionCode;
use serde::Serialize;
use tracing::{error, info};

mod config;

#[derive(Debug, Parser)]
#[command(name = "diagctl", version, about = "诊断服务命令行工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 认证后按顺序执行诊断调用
    Run {
        /// 功能名称或整数码，例如 version、dashboard、13
        #[arg(default_values = ["version", "dashboard"])]
        functions: Vec<FunctionCode>,

        /// 覆盖 DIAG_ENDPOINT
        #[arg(long)]
        endpoint: Option<String>,

        /// 以 JSON 输出结果
        #[arg(long)]
        json: bool,
    },
    /// 打印当前时间的快照文件名
    SnapshotName {
        #[arg(long, default_value = "snapshot")]
        prefix: String,

        #[arg(long, default_value = "tgz")]
        ext: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());

    // 初始化日志，输出到 stderr，不干扰结果打印
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level))
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { functions, endpoint, json } => {
            let mut cfg = config::Config::from_env()?;
            if let Some(endpoint) = endpoint {
                cfg.endpoint = endpoint;
            }
            info!("✅ 配置加载成功: endpoint={}", cfg.endpoint);

            let diag_config = cfg.to_diag_config()?;
            match run_session(&diag_config, &functions).await {
                Ok(results) => {
                    print_results(&results, json)?;
                    Ok(())
                }
                Err(e) => {
                    print_results(&e.completed, json)?;
                    error!("❌ {}", e);
                    Err(e.into())
                }
            }
        }
        Command::SnapshotName { prefix, ext } => {
            println!("{}", snapshot_file_name_now(&prefix, &ext));
            Ok(())
        }
    }
}

/// `--json` 模式下的一行输出
#[derive(Debug, Serialize)]
struct ResultLine {
    function: &'static str,
    result: serde_json::Value,
}

fn print_results(results: &[DiagnosticResult], json: bool) -> anyhow::Result<()> {
    for result in results {
        if json {
            let line = ResultLine {
                function: result.function().short_name(),
                result: result_json(result),
            };
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!("{}: {}", result.function().short_name(), result);
        }
    }
    Ok(())
}

fn result_json(result: &DiagnosticResult) -> serde_json::Value {
    match result {
        DiagnosticResult::Dashboard(value) => value.clone(),
        other => serde_json::Value::String(other.to_string()),
    }
}
