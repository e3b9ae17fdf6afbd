//! Ledgerscope configuration
use std::{path::PathBuf, time::Duration};

use alloy_primitives::{Address, BlockNumber, U256};
use clap::Parser;
use url::Url;

/// RPC endpoint configuration options
#[derive(Debug, Clone, Parser)]
pub struct RpcOpts {
    /// Websocket RPC URL of the node to scan
    #[clap(long, env = "RPC_URL", default_value = "ws://127.0.0.1:8546")]
    pub rpc_url: Url,
}

/// Tracked contract configuration options
#[derive(Debug, Clone, Parser)]
pub struct ContractOpts {
    /// Address of the multi-token contract
    #[clap(long, env = "CONTRACT_ADDRESS", default_value = "0xd07dc4262bcdbf85190c01c996b4c06a461d2430")]
    pub contract_address: Address,
    /// Token ids whose balances are tracked
    #[clap(
        long,
        env = "SUPPORTED_TOKENS",
        value_delimiter = ',',
        default_value = "12277,30297,6929,24403,77235,88849,6895,112043"
    )]
    pub supported_tokens: Vec<U256>,
}

/// Fetch retry configuration options
#[derive(Debug, Clone, Parser)]
pub struct RetryOpts {
    /// Attempts per block or receipt fetch, including the first one
    #[clap(long, env = "FETCH_MAX_ATTEMPTS", default_value = "3")]
    pub max_attempts: u32,
    /// Seconds to wait before reconnecting after a dropped connection
    #[clap(long, env = "FETCH_RETRY_BACKOFF_SECS", default_value = "60")]
    pub retry_backoff_secs: u64,
}

impl RetryOpts {
    /// The backoff as a [`Duration`]
    pub const fn backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

/// Checkpoint input/output configuration options
#[derive(Debug, Clone, Parser)]
pub struct CheckpointOpts {
    /// JSON checkpoint holding the seed ledger and the block to start from
    #[clap(long, env = "CHECKPOINT_PATH")]
    pub checkpoint: Option<PathBuf>,
    /// Block to start from; overrides the checkpoint's block
    #[clap(long, env = "START_BLOCK")]
    pub start_block: Option<BlockNumber>,
    /// Where the final ledger and block are written, on completion and on failure
    #[clap(long, env = "CHECKPOINT_OUT")]
    pub checkpoint_out: Option<PathBuf>,
    /// Where the transfer history and unhandled transactions are written
    #[clap(long, env = "FLOW_OUT")]
    pub flow_out: Option<PathBuf>,
}

/// CLI options for ledgerscope
#[derive(Debug, Clone, Parser)]
pub struct Opts {
    /// RPC endpoint configuration
    #[clap(flatten)]
    pub rpc: RpcOpts,

    /// Tracked contract configuration
    #[clap(flatten)]
    pub contract: ContractOpts,

    /// Fetch retry configuration
    #[clap(flatten)]
    pub retry: RetryOpts,

    /// Checkpoint configuration
    #[clap(flatten)]
    pub checkpoint: CheckpointOpts,
}

#[cfg(test)]
mod tests {
    use super::Opts;
    use clap::Parser;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Opts::command().debug_assert()
    }

    #[test]
    fn parses_supported_tokens_list() {
        let opts = Opts::try_parse_from([
            "ledgerscope",
            "--supported-tokens",
            "6929,12277",
            "--start-block",
            "12146082",
        ])
        .unwrap();

        assert_eq!(opts.contract.supported_tokens.len(), 2);
        assert_eq!(opts.checkpoint.start_block, Some(12146082));
        assert_eq!(opts.retry.max_attempts, 3);
        assert_eq!(opts.retry.backoff().as_secs(), 60);
    }
}
