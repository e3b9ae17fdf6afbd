//! Decoded multi-token transfer events.
use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// Identifier of a token class within the multi-token contract.
pub type TokenId = U256;

/// Which event shape a transfer was decoded from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// `TransferSingle`
    Single,
    /// `TransferBatch`
    Batch,
}

/// How a transfer moves units, determined by which side is the zero address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Units created for `to`
    Mint,
    /// Units destroyed from `from`
    Burn,
    /// Units moved between two holders
    Move,
    /// Both sides are the zero address; nobody holds anything
    Void,
}

/// One decoded `TransferSingle` or `TransferBatch` occurrence.
///
/// `ids` and `values` are parallel sequences; a single transfer carries one element each.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    /// Event shape
    pub kind: TransferKind,
    /// Transaction that emitted the event
    pub tx_hash: TxHash,
    /// Account that triggered the transfer
    pub operator: Address,
    /// Sender, zero for mints
    pub from: Address,
    /// Recipient, zero for burns
    pub to: Address,
    /// Token ids
    pub ids: Vec<TokenId>,
    /// Quantities, one per token id
    pub values: Vec<U256>,
}

impl TransferEvent {
    /// Classifies the transfer by which side is the zero address.
    pub fn direction(&self) -> TransferDirection {
        if self.from.is_zero() && self.to.is_zero() {
            TransferDirection::Void
        } else if self.from.is_zero() {
            TransferDirection::Mint
        } else if self.to.is_zero() {
            TransferDirection::Burn
        } else {
            TransferDirection::Move
        }
    }

    /// Iterates over `(token id, quantity)` pairs.
    pub fn amounts(&self) -> impl Iterator<Item = (TokenId, U256)> + '_ {
        self.ids.iter().copied().zip(self.values.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const HOLDER: Address = address!("1000000000000000000000000000000000000001");

    fn event(from: Address, to: Address) -> TransferEvent {
        TransferEvent {
            kind: TransferKind::Single,
            tx_hash: TxHash::ZERO,
            operator: HOLDER,
            from,
            to,
            ids: vec![U256::from(6929)],
            values: vec![U256::from(1)],
        }
    }

    #[test]
    fn direction_from_zero_is_mint() {
        assert_eq!(event(Address::ZERO, HOLDER).direction(), TransferDirection::Mint);
    }

    #[test]
    fn direction_to_zero_is_burn() {
        assert_eq!(event(HOLDER, Address::ZERO).direction(), TransferDirection::Burn);
    }

    #[test]
    fn direction_between_holders_is_move() {
        let other = address!("2000000000000000000000000000000000000002");
        assert_eq!(event(HOLDER, other).direction(), TransferDirection::Move);
    }

    #[test]
    fn direction_between_zero_addresses_is_void() {
        assert_eq!(event(Address::ZERO, Address::ZERO).direction(), TransferDirection::Void);
    }

    #[test]
    fn amounts_zip_ids_and_values() {
        let mut ev = event(HOLDER, Address::ZERO);
        ev.ids.push(U256::from(12277));
        ev.values.push(U256::from(3));
        let pairs: Vec<_> = ev.amounts().collect();
        assert_eq!(
            pairs,
            vec![(U256::from(6929), U256::from(1)), (U256::from(12277), U256::from(3))]
        );
    }
}
