//! Running balance ledger keyed by owner and token id.
//!
//! Balances are signed: a ledger doubles as a delta (one transaction or one block worth of
//! movements) and as the cumulative state it is merged into.
use std::{
    collections::{BTreeMap, BTreeSet, btree_map},
    fmt,
};

use alloy_primitives::{Address, I256};
use eyre::{Result, eyre};

use crate::transfer::{TokenId, TransferDirection, TransferEvent};

/// Per-owner token balances.
pub type Holdings = BTreeMap<TokenId, I256>;

/// The token ids whose balances are tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedTokens(BTreeSet<TokenId>);

impl SupportedTokens {
    /// Returns true if balances are tracked for `token`.
    pub fn contains(&self, token: &TokenId) -> bool {
        self.0.contains(token)
    }

    /// Number of tracked token ids
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no token is tracked.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<TokenId> for SupportedTokens {
    fn from_iter<I: IntoIterator<Item = TokenId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Mapping from owner to signed balance per token id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipLedger {
    owners: BTreeMap<Address, Holdings>,
}

impl OwnershipLedger {
    /// Create an empty ledger
    pub const fn new() -> Self {
        Self { owners: BTreeMap::new() }
    }

    /// Returns true if the ledger has no owner entries at all.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Number of owners with at least one entry
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Holdings of `owner`, if it has any entry.
    pub fn holdings(&self, owner: &Address) -> Option<&Holdings> {
        self.owners.get(owner)
    }

    /// Balance of `owner` for `token`, zero when absent.
    pub fn balance(&self, owner: &Address, token: &TokenId) -> I256 {
        self.owners.get(owner).and_then(|h| h.get(token)).copied().unwrap_or(I256::ZERO)
    }

    /// Sum of every owner's balance of `token`, `None` if it does not fit an [`I256`].
    pub fn total(&self, token: &TokenId) -> Option<I256> {
        self.owners
            .values()
            .filter_map(|h| h.get(token))
            .try_fold(I256::ZERO, |acc, amount| acc.checked_add(*amount))
    }

    /// Iterates over owners and their holdings, ordered by address.
    pub fn iter(&self) -> btree_map::Iter<'_, Address, Holdings> {
        self.owners.iter()
    }

    /// Adds `amount` to the entry for (`owner`, `token`), creating it if needed.
    ///
    /// The entry is kept even if the result is zero; see [`Self::normalize`]. Fails without
    /// effect if the balance would overflow.
    pub fn credit(&mut self, owner: Address, token: TokenId, amount: I256) -> Result<()> {
        self.add_all([(owner, token, amount)])
    }

    /// Adds every entry of `source` into `self`, all or nothing.
    ///
    /// Addition is exact, so merging is commutative and associative: folding per transaction
    /// or per block yields the same balances.
    pub fn merge(&mut self, source: &Self) -> Result<()> {
        self.add_all(source.owners.iter().flat_map(|(owner, holdings)| {
            holdings.iter().map(|(token, amount)| (*owner, *token, *amount))
        }))
    }

    /// Adds each `(owner, token, amount)` once every resulting balance is known to fit.
    fn add_all(
        &mut self,
        entries: impl IntoIterator<Item = (Address, TokenId, I256)>,
    ) -> Result<()> {
        let mut staged = BTreeMap::<(Address, TokenId), I256>::new();
        for (owner, token, amount) in entries {
            let current =
                staged.get(&(owner, token)).copied().unwrap_or_else(|| self.balance(&owner, &token));
            let next = current
                .checked_add(amount)
                .ok_or_else(|| eyre!("balance of token {token} for {owner:#x} overflows"))?;
            staged.insert((owner, token), next);
        }

        for ((owner, token), balance) in staged {
            self.owners.entry(owner).or_default().insert(token, balance);
        }
        Ok(())
    }

    /// Drops zero balances, then owners left without entries.
    pub fn normalize(&mut self) {
        self.owners.retain(|_, holdings| {
            holdings.retain(|_, amount| !amount.is_zero());
            !holdings.is_empty()
        });
    }

    /// Records the balance movement of `event` for the token ids in `supported`.
    ///
    /// Mints only credit the recipient and burns only debit the sender; the zero address never
    /// gets an entry, so a transfer from zero to zero changes nothing. Unsupported token ids are
    /// skipped. On error the ledger is left untouched.
    pub fn apply_transfer(
        &mut self,
        event: &TransferEvent,
        supported: &SupportedTokens,
    ) -> Result<()> {
        let amounts = event
            .amounts()
            .filter(|(token, _)| supported.contains(token))
            .map(|(token, value)| {
                I256::try_from(value).map(|amount| (token, amount)).map_err(|_| {
                    eyre!("quantity {value} of token {token} does not fit a balance")
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let direction = event.direction();
        let mut entries = Vec::with_capacity(amounts.len() * 2);
        for (token, amount) in amounts {
            match direction {
                TransferDirection::Mint => entries.push((event.to, token, amount)),
                TransferDirection::Burn => entries.push((event.from, token, -amount)),
                TransferDirection::Move => {
                    entries.push((event.from, token, -amount));
                    entries.push((event.to, token, amount));
                }
                TransferDirection::Void => {}
            }
        }
        self.add_all(entries)
    }
}

/// Later entries for the same owner and token replace earlier ones.
impl FromIterator<(Address, TokenId, I256)> for OwnershipLedger {
    fn from_iter<I: IntoIterator<Item = (Address, TokenId, I256)>>(iter: I) -> Self {
        let mut ledger = Self::new();
        for (owner, token, amount) in iter {
            ledger.owners.entry(owner).or_default().insert(token, amount);
        }
        ledger
    }
}

impl<'a> IntoIterator for &'a OwnershipLedger {
    type Item = (&'a Address, &'a Holdings);
    type IntoIter = btree_map::Iter<'a, Address, Holdings>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for OwnershipLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (owner, holdings)) in self.owners.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{owner:#x}: {{")?;
            for (j, (token, amount)) in holdings.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{token}: {amount}")?;
            }
            f.write_str("}")?;
        }
        f.write_str("}")
    }
}
