//! Bounded retry with reconnect around a [`ChainClient`].
use std::fmt;

use alloy::{
    primitives::{BlockNumber, TxHash},
    transports::TransportError,
};
use eyre::{Report, Result};
use primitives::{
    headers::{BlockSummary, ReceiptSummary},
    retries::{RetryPolicy, Strategy, is_connection_closed},
};
use tokio::time::sleep;
use tracing::warn;

use crate::ChainClient;

/// What a fetch was asking for, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A block by number
    Block(BlockNumber),
    /// A transaction receipt by hash
    Receipt(TxHash),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(number) => write!(f, "block {number}"),
            Self::Receipt(hash) => write!(f, "transaction receipt {hash}"),
        }
    }
}

/// Fetches blocks and receipts, riding out dropped connections.
///
/// A failure classified by [`is_connection_closed`] is retried up to the policy's attempt
/// ceiling, sleeping the backoff and reconnecting before each new attempt. Any other failure, or
/// the last failed attempt, is returned as a fatal error.
#[derive(Debug)]
pub struct RetryingFetcher<C> {
    client: C,
    policy: RetryPolicy,
}

impl<C: ChainClient> RetryingFetcher<C> {
    /// Wraps `client` with `policy`.
    pub const fn new(client: C, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// The wrapped client
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// The retry policy in use
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch block `number`. `Ok(None)` means the block does not exist yet.
    pub async fn block(&mut self, number: BlockNumber) -> Result<Option<BlockSummary>> {
        let resource = Resource::Block(number);
        let mut delays = self.policy.strategy();
        let mut attempt = 1;
        loop {
            match self.client.block(number).await {
                Ok(block) => return Ok(block),
                Err(err) => self.recover(resource, attempt, err, &mut delays).await?,
            }
            attempt += 1;
        }
    }

    /// Fetch the receipt of `tx_hash`. `Ok(None)` means the node has no receipt for it.
    pub async fn receipt(&mut self, tx_hash: TxHash) -> Result<Option<ReceiptSummary>> {
        let resource = Resource::Receipt(tx_hash);
        let mut delays = self.policy.strategy();
        let mut attempt = 1;
        loop {
            match self.client.receipt(tx_hash).await {
                Ok(receipt) => return Ok(receipt),
                Err(err) => self.recover(resource, attempt, err, &mut delays).await?,
            }
            attempt += 1;
        }
    }

    /// Decides whether a failed attempt is retried. Returns once the client is ready for the
    /// next attempt, or the fatal error.
    async fn recover(
        &mut self,
        resource: Resource,
        attempt: u32,
        error: TransportError,
        delays: &mut impl Strategy,
    ) -> Result<()> {
        if !is_connection_closed(&error) {
            return Err(Report::new(error).wrap_err(format!("failed to fetch {resource}")));
        }
        let Some(delay) = delays.next() else {
            return Err(Report::new(error)
                .wrap_err(format!("failed to fetch {resource} after {attempt} attempts")));
        };

        warn!(
            attempt,
            max_attempts = self.policy.max_attempts,
            %resource,
            error = %error,
            ?delay,
            "Connection closed while fetching, sleeping before reconnect"
        );
        sleep(delay).await;

        if let Err(err) = self.client.reconnect().await {
            // The next attempt fails on the stale handle and consumes an attempt.
            warn!(%resource, error = %err, "Failed to reconnect");
        }
        Ok(())
    }
}
