//! Seed and result snapshot of a scan: a ledger together with the next block to process.
//!
//! Stored as JSON with decimal strings for token ids and balances:
//!
//! ```json
//! { "block_number": 12146082, "owners": { "0xab..": { "6929": "29" } } }
//! ```
use std::{collections::BTreeMap, fs, path::Path, str::FromStr};

use alloy_primitives::{Address, B256, BlockNumber, I256, U256};
use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

use crate::ledger::OwnershipLedger;

/// A ledger snapshot valid before `block_number` is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    /// Next block to process
    pub block_number: BlockNumber,
    /// Balances as of the end of `block_number - 1`
    pub ledger: OwnershipLedger,
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    block_number: BlockNumber,
    #[serde(default)]
    owners: BTreeMap<String, BTreeMap<String, Amount>>,
}

/// Balances may be written as JSON numbers in hand-made seeds.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(i64),
    Text(String),
}

impl Amount {
    fn parse(&self) -> Result<I256> {
        match self {
            Self::Number(n) => I256::try_from(*n).map_err(|e| eyre!("invalid balance {n}: {e}")),
            Self::Text(s) => I256::from_dec_str(s).map_err(|e| eyre!("invalid balance {s:?}: {e}")),
        }
    }
}

impl Checkpoint {
    /// Create a new checkpoint
    pub const fn new(block_number: BlockNumber, ledger: OwnershipLedger) -> Self {
        Self { block_number, ledger }
    }

    /// Parses a checkpoint. Owners may be plain addresses or 32-byte left-padded words, and
    /// entries naming the same owner twice are summed. Zero balances are kept as written.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CheckpointFile = serde_json::from_str(json).wrap_err("malformed checkpoint")?;

        let mut ledger = OwnershipLedger::new();
        for (owner, holdings) in &file.owners {
            let address = parse_owner(owner)?;
            for (token, amount) in holdings {
                let token = U256::from_str(token)
                    .map_err(|e| eyre!("invalid token id {token:?} for {owner}: {e}"))?;
                ledger
                    .credit(address, token, amount.parse()?)
                    .wrap_err_with(|| format!("invalid seed balance for {owner}"))?;
            }
        }

        Ok(Self { block_number: file.block_number, ledger })
    }

    /// Renders the checkpoint as pretty JSON, owners as lowercase hex.
    pub fn to_json(&self) -> Result<String> {
        let owners = self
            .ledger
            .iter()
            .map(|(owner, holdings)| {
                let holdings = holdings
                    .iter()
                    .map(|(token, amount)| (token.to_string(), Amount::Text(amount.to_string())))
                    .collect();
                (format!("{owner:#x}"), holdings)
            })
            .collect();
        let file = CheckpointFile { block_number: self.block_number, owners };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Reads a checkpoint from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read checkpoint {}", path.display()))?;
        Self::from_json(&json).wrap_err_with(|| format!("failed to parse {}", path.display()))
    }

    /// Writes the checkpoint to `path`, replacing any previous content.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .wrap_err_with(|| format!("failed to write checkpoint {}", path.display()))
    }
}

/// Parses an owner key, accepting the topic form with 12 leading zero bytes.
fn parse_owner(key: &str) -> Result<Address> {
    if let Ok(address) = Address::from_str(key) {
        return Ok(address);
    }
    let word = B256::from_str(key).map_err(|e| eyre!("invalid owner address {key:?}: {e}"))?;
    if word[..12].iter().any(|byte| *byte != 0) {
        return Err(eyre!("owner {key:?} is not a left-padded address"));
    }
    Ok(Address::from_word(word))
}
