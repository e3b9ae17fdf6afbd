//! Block and receipt data structures consumed by the scanner.
use alloy_primitives::{BlockNumber, Bloom, Log, TxHash};
use serde::{Deserialize, Serialize};

/// The parts of a block the scanner needs: its number, log bloom and the hashes of its
/// transactions in block order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    /// Block number
    pub number: BlockNumber,
    /// Aggregated bloom over every log emitted in the block
    pub logs_bloom: Bloom,
    /// Transaction hashes
    pub transactions: Vec<TxHash>,
}

/// Transaction receipt
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ReceiptSummary {
    /// Hash of the transaction this receipt belongs to
    pub tx_hash: TxHash,
    /// `false` if the transaction reverted
    pub status: bool,
    /// Logs in emission order
    pub logs: Vec<Log>,
}

impl ReceiptSummary {
    /// Returns true if the transaction executed successfully.
    pub const fn succeeded(&self) -> bool {
        self.status
    }
}
