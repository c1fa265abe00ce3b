//! weaver 主程序：加载配置，执行一次运行并输出报告

use std::path::PathBuf;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use weaver::config::{load_config, AppConfig};
use weaver::engine::{Engine, EngineConfig, EngineDirs, RetryPolicy, RunOutcome};
use weaver::llm::create_llm_from_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .with(fmt::layer())
        .init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });

    let llm = create_llm_from_config(&cfg);
    let data_root = cfg
        .app
        .data_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let dirs = EngineDirs::under(data_root);

    let engine = Engine::new(
        llm,
        RetryPolicy::from(&cfg.retry),
        dirs,
        EngineConfig::from(cfg.engine.clone()),
    )?;

    let report = engine.execute().await;

    match &report.outcome {
        RunOutcome::Completed { l2_version } => {
            println!(
                "🏁 Run {} completed in {} steps, experience v{}",
                report.run_id, report.steps, l2_version
            );
        }
        RunOutcome::BudgetExceeded => {
            println!(
                "🛑 Run {} hit the step budget after {} steps",
                report.run_id, report.steps
            );
        }
        RunOutcome::Cancelled => {
            println!("🛑 Run {} cancelled after {} steps", report.run_id, report.steps);
        }
        RunOutcome::Aborted { reason } => {
            println!(
                "❌ Run {} aborted after {} steps: {}",
                report.run_id, report.steps, reason
            );
        }
    }

    let (prompt_tokens, completion_tokens, total_tokens) = engine.token_usage();
    if total_tokens > 0 {
        println!(
            "Tokens: prompt {} + completion {} = {}",
            prompt_tokens, completion_tokens, total_tokens
        );
    }

    Ok(())
}
