//! Ledgerscope Extractor
mod fetcher;

pub use fetcher::{Resource, RetryingFetcher};

use alloy::{
    network::ReceiptResponse,
    primitives::{BlockNumber, TxHash},
    providers::{
        Provider, ProviderBuilder, RootProvider, WsConnect, fillers::FillProvider,
        utils::JoinedRecommendedFillers,
    },
    transports::TransportResult,
};
use alloy_consensus::{BlockHeader, TxReceipt};
use alloy_rpc_client::ClientBuilder;
use alloy_rpc_types_eth::BlockNumberOrTag;
use async_trait::async_trait;
use derive_more::Debug;
use primitives::headers::{BlockSummary, ReceiptSummary};
use tracing::info;
use url::Url;

/// Alias to the default provider with all recommended fillers (read-only).
pub type DefaultProvider = FillProvider<JoinedRecommendedFillers, RootProvider>;

/// Read access to the chain, one request at a time.
///
/// `Ok(None)` means the node does not know the block or receipt; errors are transport failures.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Fetch the block at `number` with its transaction hashes.
    async fn block(&self, number: BlockNumber) -> TransportResult<Option<BlockSummary>>;

    /// Fetch the receipt of `tx_hash`.
    async fn receipt(&self, tx_hash: TxHash) -> TransportResult<Option<ReceiptSummary>>;

    /// Drop the current connection and open a new one.
    async fn reconnect(&mut self) -> TransportResult<()>;
}

/// [`ChainClient`] over a websocket provider.
#[derive(Debug)]
pub struct WsChainClient {
    url: Url,
    #[debug(skip)]
    provider: DefaultProvider,
}

impl WsChainClient {
    /// Connect to the websocket endpoint at `url`.
    pub async fn connect(url: Url) -> TransportResult<Self> {
        let provider = connect_provider(&url).await?;
        Ok(Self { url, provider })
    }
}

async fn connect_provider(url: &Url) -> TransportResult<DefaultProvider> {
    let ws = WsConnect::new(url.clone());
    let client = ClientBuilder::default().pubsub(ws).await?;
    Ok(ProviderBuilder::new().connect_client(client))
}

#[async_trait]
impl ChainClient for WsChainClient {
    async fn block(&self, number: BlockNumber) -> TransportResult<Option<BlockSummary>> {
        let block = self.provider.get_block_by_number(BlockNumberOrTag::Number(number)).await?;
        Ok(block.map(|block| BlockSummary {
            number: block.header.number(),
            logs_bloom: block.header.logs_bloom(),
            transactions: block.transactions.hashes().collect(),
        }))
    }

    async fn receipt(&self, tx_hash: TxHash) -> TransportResult<Option<ReceiptSummary>> {
        let receipt = self.provider.get_transaction_receipt(tx_hash).await?;
        Ok(receipt.map(|receipt| ReceiptSummary {
            tx_hash,
            status: ReceiptResponse::status(&receipt),
            logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
        }))
    }

    async fn reconnect(&mut self) -> TransportResult<()> {
        info!(url = %self.url, "Reconnecting to websocket provider");
        self.provider = connect_provider(&self.url).await?;
        Ok(())
    }
}
