//! In-process store used for tests, previews, and local-only sessions.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use uuid::Uuid;

use super::{records::LedgerDocument, LedgerStore, NetWorthStore};
use crate::{
    errors::{LedgerError, LedgerResult},
    ledger::{Account, ExternalAccount, OwnerId, Transaction, TransactionFilter},
    networth::{Snapshot, YearMonth},
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<OwnerId, LedgerDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a prepared document, replacing any existing one.
    pub fn with_document(document: LedgerDocument) -> Self {
        let store = Self::new();
        if let Ok(mut documents) = store.documents.lock() {
            documents.insert(document.owner.clone(), document);
        }
        store
    }

    pub fn document(&self, owner: &OwnerId) -> LedgerResult<LedgerDocument> {
        Ok(self
            .lock()?
            .get(owner)
            .cloned()
            .unwrap_or_else(|| LedgerDocument::new(owner.clone())))
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, HashMap<OwnerId, LedgerDocument>>> {
        self.documents
            .lock()
            .map_err(|_| LedgerError::Storage("memory store lock poisoned".into()))
    }

    fn read<T>(&self, owner: &OwnerId, f: impl FnOnce(&LedgerDocument) -> T) -> LedgerResult<T> {
        let documents = self.lock()?;
        Ok(match documents.get(owner) {
            Some(document) => f(document),
            None => f(&LedgerDocument::new(owner.clone())),
        })
    }

    fn write<T>(
        &self,
        owner: &OwnerId,
        f: impl FnOnce(&mut LedgerDocument) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut documents = self.lock()?;
        let document = documents
            .entry(owner.clone())
            .or_insert_with(|| LedgerDocument::new(owner.clone()));
        f(document)
    }
}

impl LedgerStore for MemoryStore {
    fn load_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<Account>> {
        self.read(owner, |doc| doc.accounts.clone())
    }

    fn load_transactions(
        &self,
        owner: &OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>> {
        self.read(owner, |doc| doc.filtered_transactions(filter))
    }

    fn save_account(&self, owner: &OwnerId, account: &Account) -> LedgerResult<()> {
        self.write(owner, |doc| {
            doc.upsert_account(account);
            Ok(())
        })
    }

    fn save_transaction(&self, owner: &OwnerId, transaction: &Transaction) -> LedgerResult<()> {
        self.write(owner, |doc| {
            doc.upsert_transaction(transaction);
            Ok(())
        })
    }

    fn delete_transaction(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()> {
        self.write(owner, |doc| doc.remove_transaction(id))
    }
}

impl NetWorthStore for MemoryStore {
    fn load_external_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<ExternalAccount>> {
        self.read(owner, |doc| doc.external_accounts.clone())
    }

    fn save_external_account(
        &self,
        owner: &OwnerId,
        account: &ExternalAccount,
    ) -> LedgerResult<()> {
        self.write(owner, |doc| {
            doc.upsert_external_account(account);
            Ok(())
        })
    }

    fn delete_external_account(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()> {
        self.write(owner, |doc| doc.remove_external_account(id))
    }

    fn load_snapshots(&self, owner: &OwnerId) -> LedgerResult<Vec<Snapshot>> {
        self.read(owner, |doc| doc.snapshots.clone())
    }

    fn save_snapshot(&self, owner: &OwnerId, snapshot: &Snapshot) -> LedgerResult<()> {
        self.write(owner, |doc| {
            doc.upsert_snapshot(snapshot);
            Ok(())
        })
    }

    fn delete_snapshot(&self, owner: &OwnerId, month: YearMonth) -> LedgerResult<()> {
        self.write(owner, |doc| doc.remove_snapshot(month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AccountNature;

    #[test]
    fn owners_are_isolated() {
        let store = MemoryStore::new();
        let ana = OwnerId::new("ana");
        let ben = OwnerId::new("ben");
        store
            .save_account(&ana, &Account::new("1000", "Cash", AccountNature::Asset))
            .unwrap();
        assert_eq!(store.load_accounts(&ana).unwrap().len(), 1);
        assert!(store.load_accounts(&ben).unwrap().is_empty());
    }

    #[test]
    fn deleting_other_owners_transaction_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .delete_transaction(&OwnerId::new("ben"), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}
