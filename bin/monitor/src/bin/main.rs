//! Interactive withdrawal monitor.
//!
//! Polls the merchant withdrawal feed on a countdown, prints the current page
//! and reads operator commands from stdin (`help` lists them).

use clap::Parser;
use client::MerchantClient;
use monitor::{
    command::{parse_input, Input, HELP},
    config::Config,
    dashboard::Dashboard,
    metrics::{install_prometheus_exporter, Metrics},
};
use std::{path::PathBuf, sync::Arc};
use store::FileStore;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, watch},
};
use tracing::{info, warn};
use withdrawal::{Command, RefreshLoop, WithdrawalReconciler};

#[derive(Parser)]
#[command(name = "monitor")]
#[command(about = "Watch merchant withdrawals and pay them out by PromptPay QR")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    monitor::init_tracing(cli.log_json);

    info!("Starting withdrawal monitor");

    let config = Config::load_or_default(&cli.config)?;
    let merchant = &config.merchant;

    info!("Loaded config:");
    info!("  Config file: {}", cli.config.display());
    info!("  Merchant API: {}", merchant.api_base);
    info!("  Store: {}", config.store_path.display());
    info!("  Refresh interval: {}s", merchant.refresh_interval_secs);

    if let Some(port) = cli.metrics_port.or(config.metrics_port) {
        install_prometheus_exporter(port)?;
        info!("  Metrics: 0.0.0.0:{}", port);
    }

    let client = MerchantClient::new(merchant)?;
    let store = FileStore::new(&config.store_path);
    let reconciler = WithdrawalReconciler::new(client, store, merchant);

    let (commands_tx, commands) = mpsc::channel::<Command>(32);
    let (shutdown_tx, shutdown) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Ctrl-C
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, shutting down");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    // Operator input
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            println!("{HELP}");
            while let Ok(Some(line)) = lines.next_line().await {
                match parse_input(&line) {
                    Ok(Some(Input::Command(command))) => {
                        if commands_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Input::Help)) => println!("{HELP}"),
                    Ok(Some(Input::Quit)) => break,
                    Ok(None) => {}
                    Err(e) => println!("error: {e}"),
                }
            }
            let _ = shutdown_tx.send(true);
        });
    }

    let mut dashboard = Dashboard::new(Metrics::new(), merchant.qr_provider.clone());
    let refresh = RefreshLoop::new(
        reconciler,
        merchant.refresh_interval_secs,
        commands,
        shutdown,
    );

    let reconciler = refresh
        .run(|reconciler, event| {
            if let Some(screen) = dashboard.on_event(reconciler, event) {
                println!("{screen}");
            }
        })
        .await;

    if let Some(error) = reconciler.last_error() {
        warn!(%error, "Exiting with unresolved error");
    }
    info!(rows = reconciler.rows().len(), "Withdrawal monitor stopped");

    Ok(())
}
