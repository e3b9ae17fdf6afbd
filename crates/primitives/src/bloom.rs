//! Log-bloom membership probes.
//!
//! A bloom never yields false negatives, so a block whose bloom rejects a probe cannot contain a
//! matching log and its receipts need not be fetched.
use alloy_primitives::{Address, B256, Bloom, BloomInput};

/// A value that may appear in a block's logs: an emitting address or a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Needle {
    /// Emitting contract address
    Address(Address),
    /// Indexed topic, including the event signature hash
    Topic(B256),
}

impl Needle {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Address(address) => address.0.as_slice(),
            Self::Topic(topic) => topic.as_slice(),
        }
    }

    /// Returns true if `bloom` possibly contains this needle.
    pub fn possibly_in(&self, bloom: &Bloom) -> bool {
        bloom.contains_input(BloomInput::Raw(self.as_bytes()))
    }
}

/// Returns true if every needle is possibly present in `bloom`.
pub fn contains_all(bloom: &Bloom, needles: &[Needle]) -> bool {
    needles.iter().all(|needle| needle.possibly_in(bloom))
}

/// Returns true if at least one needle is possibly present in `bloom`.
pub fn contains_any(bloom: &Bloom, needles: &[Needle]) -> bool {
    needles.iter().any(|needle| needle.possibly_in(bloom))
}

/// Block-level probe for transfers emitted by one contract.
#[derive(Debug, Clone)]
pub struct TransferPrefilter {
    contract: Needle,
    transfer_topics: Vec<Needle>,
}

impl TransferPrefilter {
    /// Create a prefilter matching `contract` together with any of `transfer_topics`.
    pub fn new(contract: Address, transfer_topics: impl IntoIterator<Item = B256>) -> Self {
        Self {
            contract: Needle::Address(contract),
            transfer_topics: transfer_topics.into_iter().map(Needle::Topic).collect(),
        }
    }

    /// Returns true if the block may hold a transfer log of the contract.
    pub fn matches(&self, bloom: &Bloom) -> bool {
        self.contract.possibly_in(bloom) && contains_any(bloom, &self.transfer_topics)
    }
}
