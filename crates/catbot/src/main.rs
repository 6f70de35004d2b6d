use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use catbot_core::api::{MediaWikiClient, WikiFamily, WikiReadApi, WikiWriteApi};
use catbot_core::config::{BotConfig, DEFAULT_CONFIG_FILENAME, RunOverrides, load_config};
use catbot_core::confirm::{AutoApprove, ConfirmEdits, TerminalPrompt};
use catbot_core::model::Language;
use catbot_core::pipeline::Pipeline;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVE: &str = "catbot=info";

#[derive(Debug, Parser)]
#[command(
    name = "catbot",
    version,
    about = "Adds Arabic Wikipedia categories to articles sorted into their English counterparts"
)]
struct Cli {
    #[arg(value_enum, help = "Run mode; `ask` confirms every edit interactively")]
    mode: Option<Mode>,
    #[arg(
        short = 'c',
        long = "category",
        value_name = "NAME",
        help = "Process this Arabic category instead of the unused-categories report (repeatable)"
    )]
    categories: Vec<String>,
    #[arg(long, value_name = "N", help = "Maximum number of unused categories to process")]
    limit: Option<usize>,
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Ask,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing();

    let file = load_config(&cli.config)?;
    let overrides = RunOverrides {
        ask: cli.mode == Some(Mode::Ask),
        unused_limit: cli.limit,
        categories: cli.categories,
    };
    let config = BotConfig::resolve(&file, &overrides)?;

    let mut family = WikiFamily::new(
        MediaWikiClient::new(config.ar_site.clone()).context("failed to build ar client")?,
        MediaWikiClient::new(config.en_site.clone()).context("failed to build en client")?,
    );
    for language in [Language::Ar, Language::En] {
        family.login(
            language,
            &config.credentials.username,
            &config.credentials.password,
        )?;
        tracing::info!(
            %language,
            api = family.site(language).api_url(),
            user = %config.credentials.username,
            "logged in"
        );
    }

    if config.ask {
        run_pipeline(family, TerminalPrompt::stdio(), &config)
    } else {
        run_pipeline(family, AutoApprove, &config)
    }
}

fn run_pipeline<C: ConfirmEdits>(family: WikiFamily, confirm: C, config: &BotConfig) -> Result<()> {
    let mut pipeline = Pipeline::new(family, confirm, config.pipeline_options());
    let outcome = pipeline.run();
    pipeline.report().log_summary();
    tracing::info!(requests = pipeline.api().request_count(), "done");
    if let Err(error) = outcome {
        bail!("run aborted: {error}");
    }
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// `RUST_LOG` wins when set; otherwise the bot logs at info.
fn default_filter(rust_log: Option<String>) -> EnvFilter {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}
