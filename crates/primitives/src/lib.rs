//! Core primitives for the Ledgerscope project.
/// Block log-bloom prefilter
pub mod bloom;
/// Seed/result checkpoint artifact
pub mod checkpoint;
/// Per-address transfer history
pub mod flow;
/// Block and receipt summaries
pub mod headers;
/// Signed per-address token balances
pub mod ledger;
/// Fetch retry policy and transport error classification
pub mod retries;
/// Decoded transfer events
pub mod transfer;
