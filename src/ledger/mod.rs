//! Ledger domain models and the engine that owns them.

pub mod account;
pub mod engine;
pub mod external;
pub mod transaction;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use account::{standard_chart, Account, AccountDraft, AccountNature, AccountUpdate, EntrySide};
pub use engine::{AccountBalance, LedgerEngine};
pub use external::{ExternalAccount, ExternalAccountKind, ExternalAccountMetadata};
pub use transaction::{
    ensure_balanced, Posting, PostingDraft, Transaction, TransactionDraft, TransactionFilter,
};

/// Identifies the user every account, transaction and snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reversible, file-system safe form used by on-disk stores. Lowercase
    /// ASCII letters, digits and `-` pass through; every other byte becomes
    /// `_` followed by two lowercase hex digits.
    pub fn file_stem(&self) -> String {
        if self.0.is_empty() {
            return "_".into();
        }
        let mut stem = String::with_capacity(self.0.len());
        for byte in self.0.bytes() {
            match byte {
                b'a'..=b'z' | b'0'..=b'9' | b'-' => stem.push(char::from(byte)),
                other => stem.push_str(&format!("_{:02x}", other)),
            }
        }
        stem
    }

    /// Inverse of [`OwnerId::file_stem`]; `None` for names it never produces.
    pub fn from_file_stem(stem: &str) -> Option<Self> {
        if stem == "_" {
            return Some(Self(String::new()));
        }
        let mut bytes = Vec::with_capacity(stem.len());
        let mut iter = stem.bytes();
        while let Some(byte) = iter.next() {
            match byte {
                b'a'..=b'z' | b'0'..=b'9' | b'-' => bytes.push(byte),
                b'_' => {
                    let hi = hex_value(iter.next()?)?;
                    let lo = hex_value(iter.next()?)?;
                    bytes.push(hi << 4 | lo);
                }
                _ => return None,
            }
        }
        String::from_utf8(bytes).ok().map(Self)
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems_are_distinct_and_reversible() {
        let dotted = OwnerId::new("ana.garcia");
        let underscored = OwnerId::new("ana_garcia");
        assert_eq!(dotted.file_stem(), "ana_2egarcia");
        assert_eq!(underscored.file_stem(), "ana_5fgarcia");

        for raw in ["ana", "Ana García", "../etc", "", "a_2e"] {
            let owner = OwnerId::new(raw);
            let stem = owner.file_stem();
            assert!(!stem.contains(['/', '\\', '.']), "{stem}");
            assert_eq!(OwnerId::from_file_stem(&stem), Some(owner));
        }
        assert_eq!(OwnerId::from_file_stem("Ana"), None);
        assert_eq!(OwnerId::from_file_stem("ana_2"), None);
    }
}
