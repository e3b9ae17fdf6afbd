//! Ledgerscope Driver crate root
#![allow(clippy::cognitive_complexity)]

pub mod decoder;
pub mod scanner;

pub use decoder::{ContractLog, LogDecoder, ReceiptEffects};
pub use scanner::{ScanOutcome, ScanSession, ScanStats, Scanner};
