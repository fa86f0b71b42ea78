#![expect(
    clippy::multiple_crate_versions,
    reason = "transitive dependency duplication"
)]

use clap::{Parser, Subcommand, ValueEnum};
use eyre::Context as _;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

mod account;
mod adapters;
mod amount;
mod backoff;
mod callbacks;
mod chain;
mod config;
mod doctor;
mod errors;
mod executor;
mod extract;
mod intent;
mod orchestrator;
mod paths;
mod sequencer;
mod server;
mod token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliNetworkMode {
    Mainnet,
    Testnet,
}

impl From<CliNetworkMode> for config::NetworkMode {
    fn from(v: CliNetworkMode) -> Self {
        match v {
            CliNetworkMode::Mainnet => Self::Mainnet,
            CliNetworkMode::Testnet => Self::Testnet,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "windlass", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the action pipeline over stdio.
    ///
    /// The host writes one JSON request per line ({"action", "message",
    /// "channel"?}) and reads pending/terminal callback frames from stdout.
    Serve {
        /// Override the configured network for this session.
        #[arg(long, value_enum)]
        network: Option<CliNetworkMode>,
    },

    /// Print resolved paths (useful for debugging).
    Paths,

    /// Print a quick self-diagnostic report (safe to paste; contains no secrets).
    Doctor {
        /// Emit JSON to stdout (machine-readable).
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn init_logging(paths: &paths::WindlassPaths) -> tracing_appender::non_blocking::WorkerGuard {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let file_name = paths
        .log_file
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("windlass.log.jsonl");
    let file_appender = tracing_appender::rolling::never(&paths.data_dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(env_filter.clone());
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

async fn serve(network: Option<CliNetworkMode>, paths: &paths::WindlassPaths) -> eyre::Result<()> {
    let mut cfg = config::WindlassConfig::load(paths).context("load config")?;
    if let Some(n) = network {
        cfg.network = n.into();
    }

    let key = cfg.load_private_key().context("load signing key")?;
    let account =
        account::SigningAccount::from_private_key_hex(&key).context("load signing account")?;
    tracing::info!(
        address = account.address(),
        network = cfg.network.as_str(),
        "signing account ready"
    );

    let sequencer = Arc::new(sequencer::AccountSequencer::new(account));
    let node_urls = cfg.node.resolved_urls(cfg.network);
    let client = Arc::new(chain::rest::RestClient::new(node_urls, &cfg.node)?);
    let exec = executor::Executor::new(client, &cfg.executor);
    let sink: Arc<dyn callbacks::CallbackSink> = Arc::new(callbacks::StdoutSink::new());
    let orch = Arc::new(orchestrator::Orchestrator::new(sequencer, exec, sink));

    let extractor: Arc<dyn extract::IntentExtractor> = Arc::new(extract::HttpExtractor::new(
        cfg.extractor.base_url.clone(),
        cfg.extractor.model.clone(),
        cfg.extractor_api_key(),
    )?);

    server::run(orch, extractor).await.context("serve loop failed")
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let paths = paths::WindlassPaths::discover()?;
    std::fs::create_dir_all(&paths.data_dir).context("create data dir")?;
    let _log_guard = init_logging(&paths);

    match cli.cmd {
        Command::Serve { network } => serve(network, &paths).await,
        Command::Paths => {
            use std::io::Write as _;
            let s = serde_json::to_string(&serde_json::json!({
              "config_dir": paths.config_dir,
              "data_dir": paths.data_dir,
              "log_file": paths.log_file,
            }))
            .context("serialize paths")?;
            writeln!(std::io::stdout().lock(), "{s}").context("write paths")?;
            Ok(())
        }
        Command::Doctor { json } => doctor::run(json).context("doctor failed"),
    }
}
