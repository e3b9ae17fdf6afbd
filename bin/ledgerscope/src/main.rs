//! Entrypoint.

use std::{fs, path::Path};

use alloy_primitives::TxHash;
use clap::Parser;
use config::Opts;
use dotenvy::dotenv;
use driver::{LogDecoder, ScanOutcome, ScanSession, Scanner};
use extractor::{RetryingFetcher, WsChainClient};
use eyre::{Context, eyre};
use primitives::{
    checkpoint::Checkpoint, flow::FlowHistory, ledger::OwnershipLedger, retries::RetryPolicy,
};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Transfer history dump written to `--flow-out`.
#[derive(Debug, Serialize)]
struct FlowReport<'a> {
    flow: &'a FlowHistory,
    unhandled_transactions: &'a [TxHash],
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // Try the default .env file, and ignore if it doesn't exist.
        dotenv().ok();
    }

    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("🔭 Ledgerscope starting...");

    let seed = load_seed(&opts)?;

    let client = WsChainClient::connect(opts.rpc.rpc_url.clone())
        .await
        .wrap_err_with(|| format!("failed to connect to {}", opts.rpc.rpc_url))?;
    let policy = RetryPolicy::new(opts.retry.max_attempts, opts.retry.backoff());
    let fetcher = RetryingFetcher::new(client, policy);
    let decoder = LogDecoder::new(
        opts.contract.contract_address,
        opts.contract.supported_tokens.iter().copied().collect(),
    );

    let outcome = Scanner::new(fetcher, decoder, seed).run().await;
    finish(&opts, outcome)
}

/// Writes the outputs of `outcome`. A failed scan reports its own cause over any output error.
fn finish(opts: &Opts, outcome: ScanOutcome) -> eyre::Result<()> {
    let written = write_outputs(opts, outcome.session());

    match outcome {
        ScanOutcome::Completed(_) => written,
        ScanOutcome::Failed { session, cause } => {
            if let Err(err) = written {
                error!(error = ?err, "Failed to write scan outputs");
            }
            error!(block = session.cursor, "Scan stopped, resume from this block");
            Err(cause)
        }
    }
}

/// The checkpoint to start from, with `--start-block` taking precedence over its height.
fn load_seed(opts: &Opts) -> eyre::Result<Checkpoint> {
    let checkpoint = opts.checkpoint.checkpoint.as_deref().map(Checkpoint::load).transpose()?;

    match (checkpoint, opts.checkpoint.start_block) {
        (Some(mut checkpoint), Some(start_block)) => {
            checkpoint.block_number = start_block;
            Ok(checkpoint)
        }
        (Some(checkpoint), None) => Ok(checkpoint),
        (None, Some(start_block)) => Ok(Checkpoint::new(start_block, OwnershipLedger::new())),
        (None, None) => Err(eyre!("either --checkpoint or --start-block must be provided")),
    }
}

/// Saves or prints the checkpoint, then writes the flow dump. Every output is attempted; the
/// first error is returned. A checkpoint that cannot be saved is printed instead.
fn write_outputs(opts: &Opts, session: &ScanSession) -> eyre::Result<()> {
    let checkpoint = session.checkpoint();
    let saved = match &opts.checkpoint.checkpoint_out {
        Some(path) => match checkpoint.save(path) {
            Ok(()) => {
                info!(path = %path.display(), block = checkpoint.block_number, "Checkpoint saved");
                Ok(())
            }
            Err(err) => {
                error!(error = ?err, "Checkpoint not saved, printing it instead");
                print_checkpoint(&checkpoint);
                Err(err)
            }
        },
        None => {
            print_checkpoint(&checkpoint);
            Ok(())
        }
    };

    let flow = match &opts.checkpoint.flow_out {
        Some(path) => write_flow(path, session),
        None => Ok(()),
    };

    info!(
        holders = session.ledger.len(),
        unhandled = session.unhandled.len(),
        blocks_scanned = session.stats.blocks_scanned,
        blocks_matched = session.stats.blocks_matched,
        receipts_fetched = session.stats.receipts_fetched,
        "Scan summary"
    );
    saved.and(flow)
}

fn print_checkpoint(checkpoint: &Checkpoint) {
    println!("{}", checkpoint.ledger);
    println!("{}", checkpoint.block_number);
}

fn write_flow(path: &Path, session: &ScanSession) -> eyre::Result<()> {
    let report = FlowReport { flow: &session.flow, unhandled_transactions: &session.unhandled };
    let json = serde_json::to_string_pretty(&report).wrap_err("failed to encode flow history")?;
    fs::write(path, json).wrap_err_with(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), addresses = session.flow.len(), "Flow history saved");
    Ok(())
}
