//! One-shot withdrawal tool.
//!
//! Runs a single dashboard action against the merchant API and exits:
//! - `login`: Store the merchant auth token
//! - `list`: Fetch the latest withdrawals and print one page
//! - `qr`: Fetch the latest withdrawals and print the PromptPay QR for one of them
//! - `done`: Mark a withdrawal as scanned
//! - `status`: Print a withdrawal's scan status

use clap::{Parser, Subcommand};
use client::MerchantClient;
use monitor::{
    config::Config,
    render::{render_page, render_qr},
};
use std::path::PathBuf;
use store::{FileStore, KeyValueStore};
use tracing::info;
use withdrawal::{PageSize, WithdrawalReconciler};

#[derive(Parser)]
#[command(name = "scan")]
#[command(about = "Run individual withdrawal dashboard actions")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store the merchant auth token
    Login {
        #[arg(long, env = "MERCHANT_TOKEN")]
        token: String,
    },

    /// Fetch the latest withdrawals and print one page
    List {
        /// Page to print
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rows per page (20, 30, 50 or 100)
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Print the PromptPay QR for a withdrawal
    Qr { key: String },

    /// Mark a withdrawal as scanned
    Done { key: String },

    /// Print a withdrawal's scan status
    Status { key: String },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    monitor::init_tracing(cli.log_json);

    let config = Config::load_or_default(&cli.config)?;
    let merchant = &config.merchant;
    let mut store = FileStore::new(&config.store_path);

    let command = match cli.command {
        Command::Login { token } => {
            store.set(&merchant.token_key, token.trim())?;
            info!(store = %store.path().display(), "Stored merchant token");
            return Ok(());
        }
        command => command,
    };

    let client = MerchantClient::new(merchant)?;
    let mut reconciler = WithdrawalReconciler::new(client, store, merchant);

    match command {
        Command::Login { .. } => {}
        Command::List { page, page_size } => {
            reconciler.fetch_latest(true).await?;

            if let Some(size) = page_size {
                reconciler.set_page_size(PageSize::try_from(size)?);
            }
            if page != 1 && !reconciler.go_to_page(page) {
                eyre::bail!("page {page} is out of range (1..={})", reconciler.total_pages());
            }

            print!("{}", render_page(&reconciler, None));
        }
        Command::Qr { key } => {
            reconciler.fetch_latest(true).await?;

            let payload = reconciler.show_qr(&key).await?;
            print!("{}", render_qr(&payload, &merchant.qr_provider));
        }
        Command::Done { key } => {
            reconciler.record_scan_done(&key);
            println!("{key}: {}", reconciler.scan_status(&key));
        }
        Command::Status { key } => {
            let status = reconciler
                .scan_book()
                .get(&key)
                .map_or_else(|| "unknown".to_string(), |s| s.to_string());
            println!("{key}: {status}");
        }
    }

    Ok(())
}
