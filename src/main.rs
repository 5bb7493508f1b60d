use std::path::PathBuf;
use std::sync::Arc;

use agent_core::{
    AgentLoop, AuditSink, FsAuditSink, HostMethods, MarkupCleaner, RunStatus, TracingAuditSink,
};
use anyhow::{bail, Context, Result};
use cdp_adapter::CdpDriver;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use webpilot_cli::{CliConfig, GeminiProvider};

/// Drive a browser through a natural-language task.
#[derive(Debug, Parser)]
#[command(
    name = "webpilot",
    version,
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_HASH"), ", built ", env!("BUILD_DATE"), ")"
    )
)]
struct Cli {
    /// The task to perform, in natural language.
    task: String,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the browser with a visible window.
    #[arg(long)]
    headed: bool,

    /// Directory for step attachments and the run log.
    #[arg(long)]
    audit_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(dir) = &cli.audit_dir {
        config.audit_dir = Some(dir.display().to_string());
    }

    let mut gemini = config.gemini_config();
    if gemini.api_key.is_empty() {
        gemini.api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    }
    let provider =
        Arc::new(GeminiProvider::new(gemini).context("configure a Gemini API key first")?);

    let audit: Arc<dyn AuditSink> = match &config.audit_dir {
        Some(dir) => Arc::new(FsAuditSink::new(dir).context("cannot create audit directory")?),
        None => Arc::new(TracingAuditSink),
    };

    info!("launching browser");
    let driver = Arc::new(CdpDriver::launch(config.cdp_config()).await?);

    let agent = AgentLoop::new(
        config.agent_config(),
        provider,
        driver,
        Arc::new(MarkupCleaner),
        Arc::new(HostMethods::new()),
        audit,
    );

    let outcome = agent.run(&cli.task).await;

    println!("== {} steps ==", outcome.steps_taken);
    for (index, step) in outcome.step_log.iter().enumerate() {
        println!("{:>3}. {step}", index + 1);
    }

    match outcome.status {
        RunStatus::Finished if outcome.is_success() => {
            println!("\nFinished: {}", outcome.message);
            Ok(())
        }
        RunStatus::Finished => {
            bail!("run finished with FAIL: {}", outcome.message)
        }
        RunStatus::Aborted => {
            bail!("run aborted: {}", outcome.message)
        }
    }
}
