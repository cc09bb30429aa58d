mod action;
mod app;
mod app_state;
mod component;
mod components;
mod focus;
mod intent;
mod theme;
mod widgets;

use clap::Parser;

use listen_core::client::ApiClient;
use listen_core::config::Config;

/// Browse friends' listening activity and listen along with them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the listen-along server (overrides config.toml)
    #[arg(short, long)]
    server: Option<String>,

    /// Seconds between activity polls (overrides config.toml)
    #[arg(short, long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = listen_core::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tui.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("listen-along log: {}", log_path.display());
    tracing::info!("listen-along starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("config not loaded, using defaults: {}", e);
        Config::default()
    });
    if let Some(server) = cli.server {
        config.server.base_url = server;
    }
    if let Some(secs) = cli.interval {
        config.polling.interval_secs = secs;
    }
    tracing::debug!("config: {:?}", config);

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let api = ApiClient::from_config(&config.server)?;
    app::App::new(api, &config, log_path).run().await?;

    Ok(())
}
