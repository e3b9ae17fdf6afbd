//! Classifies and decodes the logs of the tracked contract in a transaction receipt.
use alloy_primitives::{Address, Log, TxHash};
use alloy_sol_types::SolEvent;
use chainio::{ApprovalForAll, EventTopics, TransferBatch, TransferSingle};
use eyre::{Result, eyre};
use primitives::{
    headers::ReceiptSummary,
    ledger::{OwnershipLedger, SupportedTokens},
    transfer::{TransferEvent, TransferKind},
};
use tracing::warn;

/// A recognized log of the tracked contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractLog {
    /// `TransferSingle` or `TransferBatch`
    Transfer(TransferEvent),
    /// `ApprovalForAll`, which has no effect on balances
    Approval,
}

/// What a receipt contributes to the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptEffects {
    /// The transaction reverted and emitted nothing
    Reverted,
    /// No log was emitted by the tracked contract
    Untouched,
    /// The contract emitted logs, none of which could be decoded
    Unhandled,
    /// At least one log was recognized
    Handled {
        /// Transfers in log order
        transfers: Vec<TransferEvent>,
        /// Balance changes of supported tokens
        delta: OwnershipLedger,
    },
}

/// Decoder for one multi-token contract.
#[derive(Debug, Clone)]
pub struct LogDecoder {
    contract: Address,
    topics: EventTopics,
    supported: SupportedTokens,
}

impl LogDecoder {
    /// Create a decoder for `contract` tracking balances of `supported` token ids.
    pub fn new(contract: Address, supported: SupportedTokens) -> Self {
        Self { contract, topics: EventTopics::new(), supported }
    }

    /// The tracked contract
    pub const fn contract(&self) -> Address {
        self.contract
    }

    /// The event topics the decoder recognizes
    pub const fn topics(&self) -> &EventTopics {
        &self.topics
    }

    /// Decodes one log. `Ok(None)` for logs of other contracts or unknown events.
    pub fn decode_log(&self, tx_hash: TxHash, log: &Log) -> Result<Option<ContractLog>> {
        if log.address != self.contract {
            return Ok(None);
        }
        let Some(topic) = log.topics().first() else {
            return Ok(None);
        };

        if *topic == self.topics.transfer_single {
            let event = TransferSingle::decode_log_data(&log.data)?;
            return Ok(Some(ContractLog::Transfer(TransferEvent {
                kind: TransferKind::Single,
                tx_hash,
                operator: event.operator,
                from: event.from,
                to: event.to,
                ids: vec![event.id],
                values: vec![event.value],
            })));
        }
        if *topic == self.topics.transfer_batch {
            let event = TransferBatch::decode_log_data(&log.data)?;
            if event.ids.len() != event.values.len() {
                return Err(eyre!(
                    "batch carries {} ids but {} values",
                    event.ids.len(),
                    event.values.len()
                ));
            }
            return Ok(Some(ContractLog::Transfer(TransferEvent {
                kind: TransferKind::Batch,
                tx_hash,
                operator: event.operator,
                from: event.from,
                to: event.to,
                ids: event.ids,
                values: event.values,
            })));
        }
        if *topic == self.topics.approval_for_all {
            ApprovalForAll::decode_log_data(&log.data)?;
            return Ok(Some(ContractLog::Approval));
        }
        Ok(None)
    }

    /// Decodes every log of `receipt` and folds the transfers into a ledger delta.
    ///
    /// Logs that carry a known topic but fail to decode are reported and skipped; if nothing
    /// else in the receipt is recognized the transaction ends up [`ReceiptEffects::Unhandled`].
    pub fn decode_receipt(&self, receipt: &ReceiptSummary) -> ReceiptEffects {
        if !receipt.succeeded() {
            return ReceiptEffects::Reverted;
        }

        let mut touched = false;
        let mut handled = false;
        let mut transfers = Vec::new();
        let mut delta = OwnershipLedger::new();

        for (index, log) in receipt.logs.iter().enumerate() {
            if log.address != self.contract {
                continue;
            }
            touched = true;
            match self.decode_log(receipt.tx_hash, log) {
                Ok(Some(ContractLog::Transfer(event))) => {
                    if let Err(err) = delta.apply_transfer(&event, &self.supported) {
                        warn!(tx = %receipt.tx_hash, log_index = index, error = %err, "Transfer left out of the ledger");
                    }
                    transfers.push(event);
                    handled = true;
                }
                Ok(Some(ContractLog::Approval)) => handled = true,
                Ok(None) => {}
                Err(err) => {
                    warn!(tx = %receipt.tx_hash, log_index = index, error = %err, "Failed to decode contract log");
                }
            }
        }

        match (touched, handled) {
            (false, _) => ReceiptEffects::Untouched,
            (true, false) => ReceiptEffects::Unhandled,
            (true, true) => ReceiptEffects::Handled { transfers, delta },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, I256, LogData, U256, address};

    const CONTRACT: Address = address!("d07dc4262bcdbf85190c01c996b4c06a461d2430");
    const A: Address = address!("a000000000000000000000000000000000000001");
    const B: Address = address!("b000000000000000000000000000000000000002");
    const TX: B256 = B256::repeat_byte(0x11);

    fn decoder() -> LogDecoder {
        LogDecoder::new(CONTRACT, [6929u64].into_iter().map(U256::from).collect())
    }

    fn single(from: Address, to: Address, id: u64, value: u64) -> Log {
        let event = TransferSingle {
            operator: from,
            from,
            to,
            id: U256::from(id),
            value: U256::from(value),
        };
        Log { address: CONTRACT, data: event.encode_log_data() }
    }

    fn batch(from: Address, to: Address, ids: &[u64], values: &[u64]) -> Log {
        let event = TransferBatch {
            operator: from,
            from,
            to,
            ids: ids.iter().copied().map(U256::from).collect(),
            values: values.iter().copied().map(U256::from).collect(),
        };
        Log { address: CONTRACT, data: event.encode_log_data() }
    }

    fn receipt(status: bool, logs: Vec<Log>) -> ReceiptSummary {
        ReceiptSummary { tx_hash: TX, status, logs }
    }

    fn bal(v: i64) -> I256 {
        I256::try_from(v).unwrap()
    }

    #[test]
    fn decodes_single_transfer() {
        let decoded = decoder().decode_log(TX, &single(A, B, 6929, 2)).unwrap();
        let Some(ContractLog::Transfer(event)) = decoded else { panic!("expected transfer") };
        assert_eq!(event.kind, TransferKind::Single);
        assert_eq!((event.from, event.to, event.operator), (A, B, A));
        assert_eq!(event.ids, vec![U256::from(6929)]);
        assert_eq!(event.values, vec![U256::from(2)]);
        assert_eq!(event.tx_hash, TX);
    }

    #[test]
    fn ignores_other_contracts_and_unknown_topics() {
        let mut foreign = single(A, B, 6929, 2);
        foreign.address = A;
        assert_eq!(decoder().decode_log(TX, &foreign).unwrap(), None);

        let unknown = Log::new_unchecked(CONTRACT, vec![B256::repeat_byte(9)], Default::default());
        assert_eq!(decoder().decode_log(TX, &unknown).unwrap(), None);
    }

    #[test]
    fn approval_is_recognized_without_effects() {
        let approval = ApprovalForAll { account: A, operator: B, approved: true };
        let log = Log { address: CONTRACT, data: approval.encode_log_data() };

        let effects = decoder().decode_receipt(&receipt(true, vec![log]));
        assert_eq!(
            effects,
            ReceiptEffects::Handled { transfers: vec![], delta: OwnershipLedger::new() }
        );
    }

    #[test]
    fn reverted_receipt_has_no_effects() {
        let effects = decoder().decode_receipt(&receipt(false, vec![single(A, B, 6929, 2)]));
        assert_eq!(effects, ReceiptEffects::Reverted);
    }

    #[test]
    fn receipt_without_contract_logs_is_untouched() {
        let mut foreign = single(A, B, 6929, 2);
        foreign.address = B;
        assert_eq!(decoder().decode_receipt(&receipt(true, vec![foreign])), ReceiptEffects::Untouched);
        assert_eq!(decoder().decode_receipt(&receipt(true, vec![])), ReceiptEffects::Untouched);
    }

    #[test]
    fn unknown_contract_event_is_unhandled() {
        let unknown = Log::new_unchecked(CONTRACT, vec![B256::repeat_byte(9)], Default::default());
        assert_eq!(decoder().decode_receipt(&receipt(true, vec![unknown])), ReceiptEffects::Unhandled);
    }

    #[test]
    fn undecodable_transfer_is_unhandled() {
        let mut broken = single(A, B, 6929, 2);
        broken.data = LogData::new_unchecked(broken.data.topics().to_vec(), Default::default());
        assert_eq!(decoder().decode_receipt(&receipt(true, vec![broken])), ReceiptEffects::Unhandled);
    }

    #[test]
    fn single_and_batch_of_one_are_equivalent() {
        let ReceiptEffects::Handled { transfers: single_transfers, delta: single_delta } =
            decoder().decode_receipt(&receipt(true, vec![single(A, B, 6929, 4)]))
        else {
            panic!("expected handled receipt")
        };
        let ReceiptEffects::Handled { transfers: batch_transfers, delta: batch_delta } =
            decoder().decode_receipt(&receipt(true, vec![batch(A, B, &[6929], &[4])]))
        else {
            panic!("expected handled receipt")
        };

        assert_eq!(single_delta, batch_delta);
        assert_eq!(single_transfers[0].ids, batch_transfers[0].ids);
        assert_eq!(single_transfers[0].values, batch_transfers[0].values);
        assert_eq!(single_delta.balance(&B, &U256::from(6929)), bal(4));
    }

    #[test]
    fn unsupported_tokens_stay_out_of_the_delta() {
        let effects =
            decoder().decode_receipt(&receipt(true, vec![batch(A, B, &[6929, 12277], &[1, 3])]));
        let ReceiptEffects::Handled { transfers, delta } = effects else {
            panic!("expected handled receipt")
        };

        assert_eq!(transfers.len(), 1);
        assert_eq!(delta.balance(&A, &U256::from(6929)), bal(-1));
        assert_eq!(delta.balance(&B, &U256::from(12277)), I256::ZERO);
    }

    #[test]
    fn mint_and_burn_in_one_receipt() {
        let logs = vec![single(Address::ZERO, A, 6929, 5), single(A, Address::ZERO, 6929, 2)];
        let ReceiptEffects::Handled { transfers, delta } =
            decoder().decode_receipt(&receipt(true, logs))
        else {
            panic!("expected handled receipt")
        };

        assert_eq!(transfers.len(), 2);
        assert_eq!(delta.balance(&A, &U256::from(6929)), bal(3));
        assert!(delta.holdings(&Address::ZERO).is_none());
    }
}
