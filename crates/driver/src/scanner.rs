//! Sequential block scan that folds contract transfers into the ownership ledger.
use alloy_primitives::{BlockNumber, TxHash};
use extractor::{ChainClient, RetryingFetcher};
use eyre::{Context, Report, Result};
use primitives::{
    bloom::TransferPrefilter,
    checkpoint::Checkpoint,
    flow::FlowHistory,
    headers::BlockSummary,
    ledger::OwnershipLedger,
};
use tracing::{error, info, warn};

use crate::decoder::{LogDecoder, ReceiptEffects};

/// Number of blocks between two progress lines.
const PROGRESS_INTERVAL: u64 = 1000;

/// Counters reported at the end of a scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Blocks fully processed, filtered out or not
    pub blocks_scanned: u64,
    /// Blocks whose bloom passed the prefilter
    pub blocks_matched: u64,
    /// Receipts fetched
    pub receipts_fetched: u64,
}

/// Everything a scan accumulates. Owned by the [`Scanner`] while it runs.
#[derive(Debug, Default, Clone)]
pub struct ScanSession {
    /// Next block to process
    pub cursor: BlockNumber,
    /// Balances of the supported tokens as of `cursor - 1`
    pub ledger: OwnershipLedger,
    /// History of every transfer seen
    pub flow: FlowHistory,
    /// Transactions that touched the contract without a recognized log
    pub unhandled: Vec<TxHash>,
    /// Counters
    pub stats: ScanStats,
}

impl ScanSession {
    /// Start a session from a seed checkpoint, dropping zero balances from the seed.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        let Checkpoint { block_number, mut ledger } = checkpoint;
        ledger.normalize();
        Self { cursor: block_number, ledger, ..Default::default() }
    }

    /// The ledger and cursor, suitable to seed the next run.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.cursor, self.ledger.clone())
    }
}

/// How a scan ended. The session is returned in both cases so progress is never lost.
#[derive(Debug)]
pub enum ScanOutcome {
    /// The chain head was reached; `session.cursor` is the first missing block.
    Completed(ScanSession),
    /// A fetch failed for good; `session.cursor` is the block that could not be processed.
    Failed {
        /// State as of the last fully processed block
        session: ScanSession,
        /// The fatal error
        cause: Report,
    },
}

impl ScanOutcome {
    /// The session in either case
    pub const fn session(&self) -> &ScanSession {
        match self {
            Self::Completed(session) | Self::Failed { session, .. } => session,
        }
    }

    /// Returns true if the scan reached the chain head.
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Result of one step of the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Advanced,
    ChainHead,
}

/// Walks blocks one at a time from the session cursor until the chain head.
#[derive(Debug)]
pub struct Scanner<C> {
    fetcher: RetryingFetcher<C>,
    decoder: LogDecoder,
    prefilter: TransferPrefilter,
    session: ScanSession,
}

impl<C: ChainClient> Scanner<C> {
    /// Create a scanner starting from `checkpoint`.
    pub fn new(fetcher: RetryingFetcher<C>, decoder: LogDecoder, checkpoint: Checkpoint) -> Self {
        let prefilter = TransferPrefilter::new(decoder.contract(), decoder.topics().transfers());
        Self { fetcher, decoder, prefilter, session: ScanSession::from_checkpoint(checkpoint) }
    }

    /// The current session
    pub const fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Runs until the chain head or the first fatal error.
    ///
    /// The ledger in the outcome is normalized.
    pub async fn run(mut self) -> ScanOutcome {
        info!(start_block = self.session.cursor, holders = self.session.ledger.len(), "Starting scan");
        loop {
            match self.step().await {
                Ok(Step::Advanced) => {
                    if self.session.cursor % PROGRESS_INTERVAL == 0 {
                        info!(
                            cursor = self.session.cursor,
                            matched = self.session.stats.blocks_matched,
                            receipts = self.session.stats.receipts_fetched,
                            "Scan progress"
                        );
                    }
                }
                Ok(Step::ChainHead) => {
                    info!(block = self.session.cursor, "End reached");
                    self.session.ledger.normalize();
                    return ScanOutcome::Completed(self.session);
                }
                Err(cause) => {
                    error!(block = self.session.cursor, error = ?cause, "Scan failed");
                    self.session.ledger.normalize();
                    return ScanOutcome::Failed { session: self.session, cause };
                }
            }
        }
    }

    /// Processes the block at the cursor and advances it.
    async fn step(&mut self) -> Result<Step> {
        let number = self.session.cursor;
        let Some(block) = self.fetcher.block(number).await? else {
            return Ok(Step::ChainHead);
        };
        if block.number != number {
            warn!(requested = number, received = block.number, "Node returned a different block");
        }

        if self.prefilter.matches(&block.logs_bloom) {
            self.session.stats.blocks_matched += 1;
            let delta = self.process_block(&block).await?;
            self.session
                .ledger
                .merge(&delta)
                .wrap_err_with(|| format!("failed to apply the delta of block {number}"))?;
        }

        self.session.stats.blocks_scanned += 1;
        self.session.cursor += 1;
        Ok(Step::Advanced)
    }

    /// Decodes every transaction of `block` and returns the block's combined delta.
    ///
    /// The delta is only merged by the caller once the whole block succeeded, so a failure
    /// leaves the ledger consistent with the cursor.
    async fn process_block(&mut self, block: &BlockSummary) -> Result<OwnershipLedger> {
        let mut block_delta = OwnershipLedger::new();
        for tx_hash in &block.transactions {
            let Some(receipt) = self.fetcher.receipt(*tx_hash).await? else {
                warn!(block = block.number, tx = %tx_hash, "Receipt not found");
                self.session.unhandled.push(*tx_hash);
                continue;
            };
            self.session.stats.receipts_fetched += 1;

            match self.decoder.decode_receipt(&receipt) {
                ReceiptEffects::Reverted | ReceiptEffects::Untouched => {}
                ReceiptEffects::Unhandled => self.session.unhandled.push(*tx_hash),
                ReceiptEffects::Handled { transfers, delta } => {
                    for transfer in &transfers {
                        self.session.flow.record(transfer);
                    }
                    if !delta.is_empty() {
                        info!(tx = %tx_hash, %delta, "Ledger delta");
                        block_delta.merge(&delta).wrap_err_with(|| {
                            format!("failed to combine the delta of transaction {tx_hash}")
                        })?;
                    }
                }
            }
        }
        Ok(block_delta)
    }
}
