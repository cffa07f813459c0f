//! Coin-selection and transaction-composition engine: the fee/change/
//! selection fixed-point loop for a UTXO-based, Shelley-era Cardano
//! ledger. See each module for its corresponding component.

pub mod accountant;
pub mod change_builder;
pub mod composer;
pub mod config;
pub mod error;
pub mod finalizer;
pub mod model;
pub mod normalizer;
pub mod oracle;
pub mod selection;
pub mod simple_oracle;

#[cfg(feature = "cml")]
pub mod cml_oracle;

pub use composer::{compose, ComposeRequest};
pub use config::{ComposeOptions, ProtocolParams};
pub use error::CoinSelectionError;
pub use oracle::LedgerOracle;
