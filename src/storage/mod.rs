//! Persistence collaborators consumed by the ledger engine and net-worth tracker.
//!
//! Every call is scoped by an [`OwnerId`]; implementations never return data
//! belonging to another owner.

pub mod json_backend;
pub mod memory;
pub mod records;

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    errors::LedgerResult,
    ledger::{Account, ExternalAccount, OwnerId, Transaction, TransactionFilter},
    networth::{Snapshot, YearMonth},
};

pub use json_backend::{BackupInfo, JsonStore};
pub use memory::MemoryStore;
pub use records::{LedgerDocument, CURRENT_SCHEMA_VERSION};

/// Durable store for ledger accounts and transactions.
pub trait LedgerStore: Send + Sync {
    fn load_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<Account>>;
    fn load_transactions(
        &self,
        owner: &OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>>;
    /// Inserts or replaces the account with the same id.
    fn save_account(&self, owner: &OwnerId, account: &Account) -> LedgerResult<()>;
    /// Inserts or replaces the transaction (and its full posting set) with the same id.
    fn save_transaction(&self, owner: &OwnerId, transaction: &Transaction) -> LedgerResult<()>;
    fn delete_transaction(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()>;
}

/// Durable store for manually tracked accounts and monthly snapshots.
pub trait NetWorthStore: Send + Sync {
    fn load_external_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<ExternalAccount>>;
    fn save_external_account(&self, owner: &OwnerId, account: &ExternalAccount)
        -> LedgerResult<()>;
    fn delete_external_account(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()>;
    fn load_snapshots(&self, owner: &OwnerId) -> LedgerResult<Vec<Snapshot>>;
    /// Upserts by month: at most one snapshot per `YearMonth` is kept.
    fn save_snapshot(&self, owner: &OwnerId, snapshot: &Snapshot) -> LedgerResult<()>;
    fn delete_snapshot(&self, owner: &OwnerId, month: YearMonth) -> LedgerResult<()>;
}

impl<T: LedgerStore + ?Sized> LedgerStore for Arc<T> {
    fn load_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<Account>> {
        (**self).load_accounts(owner)
    }

    fn load_transactions(
        &self,
        owner: &OwnerId,
        filter: &TransactionFilter,
    ) -> LedgerResult<Vec<Transaction>> {
        (**self).load_transactions(owner, filter)
    }

    fn save_account(&self, owner: &OwnerId, account: &Account) -> LedgerResult<()> {
        (**self).save_account(owner, account)
    }

    fn save_transaction(&self, owner: &OwnerId, transaction: &Transaction) -> LedgerResult<()> {
        (**self).save_transaction(owner, transaction)
    }

    fn delete_transaction(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()> {
        (**self).delete_transaction(owner, id)
    }
}

impl<T: NetWorthStore + ?Sized> NetWorthStore for Arc<T> {
    fn load_external_accounts(&self, owner: &OwnerId) -> LedgerResult<Vec<ExternalAccount>> {
        (**self).load_external_accounts(owner)
    }

    fn save_external_account(
        &self,
        owner: &OwnerId,
        account: &ExternalAccount,
    ) -> LedgerResult<()> {
        (**self).save_external_account(owner, account)
    }

    fn delete_external_account(&self, owner: &OwnerId, id: Uuid) -> LedgerResult<()> {
        (**self).delete_external_account(owner, id)
    }

    fn load_snapshots(&self, owner: &OwnerId) -> LedgerResult<Vec<Snapshot>> {
        (**self).load_snapshots(owner)
    }

    fn save_snapshot(&self, owner: &OwnerId, snapshot: &Snapshot) -> LedgerResult<()> {
        (**self).save_snapshot(owner, snapshot)
    }

    fn delete_snapshot(&self, owner: &OwnerId, month: YearMonth) -> LedgerResult<()> {
        (**self).delete_snapshot(owner, month)
    }
}
