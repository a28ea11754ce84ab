//! Versioned on-disk record schema and its (de)serialization boundary.
//!
//! Money always crosses this boundary as `{ amount_minor, currency }` (see
//! [`MoneyRecord`]); no floating-point major-unit amounts are ever written.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{LedgerError, LedgerResult},
    ledger::{Account, ExternalAccount, OwnerId, Transaction, TransactionFilter},
    networth::{Snapshot, YearMonth},
};

pub use crate::currency::MoneyRecord;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Everything persisted for one owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerDocument {
    pub schema_version: u32,
    pub owner: OwnerId,
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub external_accounts: Vec<ExternalAccount>,
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

#[derive(Deserialize)]
struct SchemaHeader {
    #[serde(default)]
    schema_version: u32,
}

impl LedgerDocument {
    pub fn new(owner: OwnerId) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            owner,
            accounts: Vec::new(),
            transactions: Vec::new(),
            external_accounts: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn upsert_account(&mut self, account: &Account) {
        upsert_by(&mut self.accounts, account.clone(), |a| a.id == account.id);
    }

    pub fn upsert_transaction(&mut self, transaction: &Transaction) {
        upsert_by(&mut self.transactions, transaction.clone(), |t| {
            t.id == transaction.id
        });
    }

    pub fn remove_transaction(&mut self, id: Uuid) -> LedgerResult<()> {
        remove_by(&mut self.transactions, |t| t.id == id)
            .ok_or_else(|| LedgerError::not_found(format!("transaction {}", id)))
            .map(|_| ())
    }

    pub fn filtered_transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|txn| filter.matches(txn))
            .cloned()
            .collect()
    }

    pub fn upsert_external_account(&mut self, account: &ExternalAccount) {
        upsert_by(&mut self.external_accounts, account.clone(), |a| {
            a.id == account.id
        });
    }

    pub fn remove_external_account(&mut self, id: Uuid) -> LedgerResult<()> {
        remove_by(&mut self.external_accounts, |a| a.id == id)
            .ok_or_else(|| LedgerError::not_found(format!("external account {}", id)))
            .map(|_| ())
    }

    pub fn upsert_snapshot(&mut self, snapshot: &Snapshot) {
        upsert_by(&mut self.snapshots, snapshot.clone(), |s| {
            s.month == snapshot.month
        });
        self.snapshots.sort_by_key(|s| s.month);
    }

    pub fn remove_snapshot(&mut self, month: YearMonth) -> LedgerResult<()> {
        remove_by(&mut self.snapshots, |s| s.month == month)
            .ok_or_else(|| LedgerError::not_found(format!("snapshot {}", month)))
            .map(|_| ())
    }
}

/// Parses a stored document, refusing schema versions newer than this build.
pub fn decode_document(data: &str) -> LedgerResult<LedgerDocument> {
    let header: SchemaHeader = serde_json::from_str(data)?;
    if header.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(LedgerError::UnsupportedSchema {
            found: header.schema_version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    let mut document: LedgerDocument = serde_json::from_str(data)?;
    document.schema_version = CURRENT_SCHEMA_VERSION;
    Ok(document)
}

pub fn encode_document(document: &LedgerDocument) -> LedgerResult<String> {
    Ok(serde_json::to_string_pretty(document)?)
}

fn upsert_by<T, F>(items: &mut Vec<T>, item: T, matches: F)
where
    F: Fn(&T) -> bool,
{
    match items.iter_mut().find(|existing| matches(existing)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

fn remove_by<T, F>(items: &mut Vec<T>, matches: F) -> Option<T>
where
    F: Fn(&T) -> bool,
{
    let index = items.iter().position(matches)?;
    Some(items.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Account, AccountNature};

    #[test]
    fn rejects_newer_schema_versions() {
        let mut document = LedgerDocument::new(OwnerId::new("ana"));
        document.schema_version = CURRENT_SCHEMA_VERSION + 3;
        let json = serde_json::to_string(&document).unwrap();
        let err = decode_document(&json).expect_err("newer schema must be rejected");
        assert!(matches!(err, LedgerError::UnsupportedSchema { found, .. } if found == 4));
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut document = LedgerDocument::new(OwnerId::new("ana"));
        let mut account = Account::new("1000", "Cash", AccountNature::Asset);
        document.upsert_account(&account);
        account.name = "Petty Cash".into();
        document.upsert_account(&account);
        assert_eq!(document.accounts.len(), 1);
        assert_eq!(document.accounts[0].name, "Petty Cash");
    }

    #[test]
    fn removing_unknown_transaction_is_not_found() {
        let mut document = LedgerDocument::new(OwnerId::new("ana"));
        let err = document.remove_transaction(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn removing_existing_external_account_drops_it() {
        let mut document = LedgerDocument::new(OwnerId::new("ana"));
        let account = ExternalAccount::new(
            "House",
            crate::ledger::ExternalAccountKind::Property,
            crate::currency::Money::from_minor(100, crate::currency::CurrencyCode::new("MXN")),
        );
        document.upsert_external_account(&account);
        document.remove_external_account(account.id).unwrap();
        assert!(document.external_accounts.is_empty());
        assert!(document.remove_external_account(account.id).is_err());
    }
}
