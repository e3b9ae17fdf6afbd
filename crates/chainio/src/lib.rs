//! `ChainIO` holds the bindings of the multi-token contract whose transfers are tracked.
use alloy::sol;
use alloy_primitives::{B256, keccak256};
use alloy_sol_types::SolEvent;

pub use IMultiToken::{ApprovalForAll, TransferBatch, TransferSingle};

sol! {
    #[allow(missing_docs)]
    #[derive(Debug, PartialEq, Eq)]
    interface IMultiToken {
        event TransferSingle(
            address indexed operator,
            address indexed from,
            address indexed to,
            uint256 id,
            uint256 value
        );
        event TransferBatch(
            address indexed operator,
            address indexed from,
            address indexed to,
            uint256[] ids,
            uint256[] values
        );
        event ApprovalForAll(address indexed account, address indexed operator, bool approved);
    }
}

/// The first-topic hashes that identify the contract events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventTopics {
    /// `TransferSingle(address,address,address,uint256,uint256)`
    pub transfer_single: B256,
    /// `TransferBatch(address,address,address,uint256[],uint256[])`
    pub transfer_batch: B256,
    /// `ApprovalForAll(address,address,bool)`
    pub approval_for_all: B256,
}

impl Default for EventTopics {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTopics {
    /// Hashes the canonical event signatures.
    pub fn new() -> Self {
        Self {
            transfer_single: keccak256(TransferSingle::SIGNATURE),
            transfer_batch: keccak256(TransferBatch::SIGNATURE),
            approval_for_all: keccak256(ApprovalForAll::SIGNATURE),
        }
    }

    /// Topics of the events that move tokens.
    pub const fn transfers(&self) -> [B256; 2] {
        [self.transfer_single, self.transfer_batch]
    }
}
