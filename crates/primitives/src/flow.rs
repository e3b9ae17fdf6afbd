//! Append-only history of every transfer an address took part in.
//!
//! Unlike the ledger this records all token ids, supported or not, and is never normalized.
use std::collections::{BTreeMap, btree_map};

use alloy_primitives::{Address, TxHash, U256};
use serde::{Serialize, Serializer, ser::SerializeSeq};

use crate::transfer::{TokenId, TransferDirection, TransferEvent};

/// One recorded transfer from the point of view of a single address.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct FlowEntry {
    /// Transaction that emitted the transfer
    pub tx_hash: TxHash,
    /// The other side of a move; `None` for mints and burns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counterparty: Option<Address>,
    /// Token ids
    #[serde(serialize_with = "serialize_decimal")]
    pub token_ids: Vec<TokenId>,
    /// Quantities, parallel to `token_ids`
    #[serde(serialize_with = "serialize_decimal")]
    pub quantities: Vec<U256>,
}

/// The categorized history of one address.
#[derive(Debug, Default, Serialize, Clone, PartialEq, Eq)]
pub struct AddressFlow {
    /// Units minted to the address
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub minted: Vec<FlowEntry>,
    /// Units burned from the address
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub burned: Vec<FlowEntry>,
    /// Units sent to another holder
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sent: Vec<FlowEntry>,
    /// Units received from another holder
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub received: Vec<FlowEntry>,
}

/// Flow history of every address seen so far.
#[derive(Debug, Default, Serialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct FlowHistory {
    addresses: BTreeMap<Address, AddressFlow>,
}

impl FlowHistory {
    /// Create an empty history
    pub const fn new() -> Self {
        Self { addresses: BTreeMap::new() }
    }

    /// History of `address`, if it appeared in any transfer.
    pub fn get(&self, address: &Address) -> Option<&AddressFlow> {
        self.addresses.get(address)
    }

    /// Number of addresses with history
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Iterates over addresses and their history, ordered by address.
    pub fn iter(&self) -> btree_map::Iter<'_, Address, AddressFlow> {
        self.addresses.iter()
    }

    /// Appends `event` to the history of the addresses it involves.
    pub fn record(&mut self, event: &TransferEvent) {
        let entry = |counterparty| FlowEntry {
            tx_hash: event.tx_hash,
            counterparty,
            token_ids: event.ids.clone(),
            quantities: event.values.clone(),
        };
        match event.direction() {
            TransferDirection::Mint => self.entry(event.to).minted.push(entry(None)),
            TransferDirection::Burn => self.entry(event.from).burned.push(entry(None)),
            TransferDirection::Move => {
                self.entry(event.from).sent.push(entry(Some(event.to)));
                self.entry(event.to).received.push(entry(Some(event.from)));
            }
            TransferDirection::Void => {}
        }
    }

    fn entry(&mut self, address: Address) -> &mut AddressFlow {
        self.addresses.entry(address).or_default()
    }
}

impl<'a> IntoIterator for &'a FlowHistory {
    type Item = (&'a Address, &'a AddressFlow);
    type IntoIter = btree_map::Iter<'a, Address, AddressFlow>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn serialize_decimal<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for value in values {
        seq.serialize_element(&value.to_string())?;
    }
    seq.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::TransferKind;
    use alloy_primitives::{B256, address};

    const A: Address = address!("a000000000000000000000000000000000000001");
    const B: Address = address!("b000000000000000000000000000000000000002");

    fn transfer(tx: u8, from: Address, to: Address, id: u64, value: u64) -> TransferEvent {
        TransferEvent {
            kind: TransferKind::Single,
            tx_hash: B256::repeat_byte(tx),
            operator: from,
            from,
            to,
            ids: vec![U256::from(id)],
            values: vec![U256::from(value)],
        }
    }

    #[test]
    fn mint_records_only_recipient() {
        let mut flow = FlowHistory::new();
        flow.record(&transfer(1, Address::ZERO, A, 6929, 5));

        assert_eq!(flow.len(), 1);
        let minted = &flow.get(&A).unwrap().minted;
        assert_eq!(
            minted,
            &vec![FlowEntry {
                tx_hash: B256::repeat_byte(1),
                counterparty: None,
                token_ids: vec![U256::from(6929)],
                quantities: vec![U256::from(5)],
            }]
        );
    }

    #[test]
    fn burn_records_only_sender() {
        let mut flow = FlowHistory::new();
        flow.record(&transfer(1, A, Address::ZERO, 6929, 5));

        let history = flow.get(&A).unwrap();
        assert_eq!(history.burned.len(), 1);
        assert!(history.minted.is_empty());
        assert!(flow.get(&Address::ZERO).is_none());
    }

    #[test]
    fn transfer_between_zero_addresses_records_nothing() {
        let mut flow = FlowHistory::new();
        flow.record(&transfer(1, Address::ZERO, Address::ZERO, 6929, 5));
        assert!(flow.is_empty());
    }

    #[test]
    fn move_records_both_sides_with_counterparties() {
        let mut flow = FlowHistory::new();
        flow.record(&transfer(1, A, B, 12277, 3));

        assert_eq!(flow.get(&A).unwrap().sent[0].counterparty, Some(B));
        assert_eq!(flow.get(&B).unwrap().received[0].counterparty, Some(A));
    }

    #[test]
    fn entries_are_appended_in_order() {
        let mut flow = FlowHistory::new();
        flow.record(&transfer(1, A, B, 6929, 1));
        flow.record(&transfer(2, A, B, 6929, 2));

        let sent: Vec<_> = flow.get(&A).unwrap().sent.iter().map(|e| e.tx_hash).collect();
        assert_eq!(sent, vec![B256::repeat_byte(1), B256::repeat_byte(2)]);
    }

    #[test]
    fn serializes_decimal_amounts_and_skips_empty_categories() {
        let mut flow = FlowHistory::new();
        flow.record(&transfer(1, Address::ZERO, A, 6929, 5));

        let json = serde_json::to_value(&flow).unwrap();
        let history = &json["0xa000000000000000000000000000000000000001"];
        assert_eq!(history["minted"][0]["token_ids"], serde_json::json!(["6929"]));
        assert_eq!(history["minted"][0]["quantities"], serde_json::json!(["5"]));
        assert!(history.get("sent").is_none());
        assert!(history["minted"][0].get("counterparty").is_none());
    }
}
