#![doc(test(attr(deny(warnings))))]

//! Ledger Core is a double-entry bookkeeping engine for personal finance:
//! balanced transactions over a chart of accounts, point-in-time balances,
//! financial statements, and monthly net-worth snapshots.

pub mod config;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod networth;
pub mod reports;
pub mod storage;
pub mod utils;

pub use errors::{LedgerError, LedgerResult};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!(
            version = utils::build_info::current().version,
            "Ledger Core tracing initialized."
        );
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
