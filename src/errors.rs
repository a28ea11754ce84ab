use chrono::NaiveDate;
use thiserror::Error;

/// Error type that captures ledger, currency, and persistence failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("currency mismatch: cannot combine {left} with {right}")]
    CurrencyMismatch { left: String, right: String },
    #[error("FX rate {from} → {to} missing on {date}")]
    FxMissing {
        from: String,
        to: String,
        date: NaiveDate,
    },
    #[error("transaction debits must equal credits (debits {debits}, credits {credits})")]
    UnbalancedTransaction { debits: String, credits: String },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("ledger schema v{found} is newer than supported v{supported}")]
    UnsupportedSchema { found: u32, supported: u32 },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        LedgerError::NotFound(message.into())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbalanced_message_names_the_rule() {
        let err = LedgerError::UnbalancedTransaction {
            debits: "100.00".into(),
            credits: "99.00".into(),
        };
        let message = err.to_string();
        assert!(message.contains("debits must equal credits"), "{message}");
        assert!(message.contains("99.00"));
    }

    #[test]
    fn io_errors_map_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = LedgerError::from(io);
        assert!(matches!(err, LedgerError::Storage(ref msg) if msg.contains("disk full")));
    }
}
