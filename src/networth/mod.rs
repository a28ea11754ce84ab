//! Manually tracked accounts and the monthly net-worth snapshots built from them.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;
use uuid::Uuid;

use crate::{
    currency::{FxConverter, Money},
    errors::{LedgerError, LedgerResult},
    ledger::{AccountNature, ExternalAccount, LedgerEngine, OwnerId},
    reports::networth::{build_net_worth, BalanceSource},
    storage::NetWorthStore,
};

/// Calendar month, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> LedgerResult<Self> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(LedgerError::validation(format!(
                "{}-{:02} is not a calendar month",
                year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = LedgerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::validation(format!("`{}` is not a YYYY-MM month", raw));
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSnapshot {
    pub account_id: Uuid,
    pub name: String,
    pub source: BalanceSource,
    pub nature: AccountNature,
    pub balance: Money,
    pub included: bool,
}

/// Point-in-time capture of net worth for one month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub month: YearMonth,
    pub net_worth_base: Money,
    pub totals_by_nature: BTreeMap<AccountNature, Money>,
    pub account_snapshots: Vec<AccountSnapshot>,
    pub created_at: DateTime<Utc>,
}

/// Owner-scoped manager for external accounts and monthly snapshots.
pub struct NetWorthTracker {
    owner: OwnerId,
    store: Box<dyn NetWorthStore>,
    accounts: Vec<ExternalAccount>,
    snapshots: Vec<Snapshot>,
}

impl NetWorthTracker {
    pub fn open(owner: OwnerId, store: Box<dyn NetWorthStore>) -> LedgerResult<Self> {
        let accounts = store.load_external_accounts(&owner)?;
        let mut snapshots = store.load_snapshots(&owner)?;
        snapshots.sort_by_key(|snapshot| snapshot.month);
        Ok(Self {
            owner,
            store,
            accounts,
            snapshots,
        })
    }

    pub fn accounts(&self) -> &[ExternalAccount] {
        &self.accounts
    }

    pub fn get_account(&self, id: Uuid) -> LedgerResult<&ExternalAccount> {
        self.accounts
            .iter()
            .find(|account| account.id == id)
            .ok_or_else(|| LedgerError::not_found(format!("external account {}", id)))
    }

    pub fn add_account(&mut self, account: ExternalAccount) -> LedgerResult<ExternalAccount> {
        validate_account(&account)?;
        if self.accounts.iter().any(|a| a.id == account.id) {
            return Err(LedgerError::validation(format!(
                "external account {} already exists",
                account.id
            )));
        }
        self.store.save_external_account(&self.owner, &account)?;
        info!(owner = %self.owner, account = %account.name, kind = %account.kind, "external account added");
        self.accounts.push(account.clone());
        Ok(account)
    }

    /// Replaces name, kind, flags and metadata of an existing account.
    pub fn update_account(&mut self, account: ExternalAccount) -> LedgerResult<ExternalAccount> {
        validate_account(&account)?;
        let index = self.index_of(account.id)?;
        let mut updated = account;
        updated.created_at = self.accounts[index].created_at;
        updated.updated_at = Utc::now();
        self.store.save_external_account(&self.owner, &updated)?;
        self.accounts[index] = updated.clone();
        Ok(updated)
    }

    /// Overwrites the single mutable balance field.
    pub fn update_balance(&mut self, id: Uuid, balance: Money) -> LedgerResult<ExternalAccount> {
        let index = self.index_of(id)?;
        let mut account = self.accounts[index].clone();
        if balance.currency() != &account.currency {
            return Err(LedgerError::CurrencyMismatch {
                left: account.currency.to_string(),
                right: balance.currency().to_string(),
            });
        }
        account.balance = balance;
        account.updated_at = Utc::now();
        self.store.save_external_account(&self.owner, &account)?;
        info!(owner = %self.owner, account = %account.name, balance = %account.balance, "external balance updated");
        self.accounts[index] = account.clone();
        Ok(account)
    }

    pub fn remove_account(&mut self, id: Uuid) -> LedgerResult<()> {
        let index = self.index_of(id)?;
        self.store.delete_external_account(&self.owner, id)?;
        self.accounts.remove(index);
        Ok(())
    }

    /// Captures net worth as of the month's last day in the ledger currency.
    /// Re-running for the same month replaces the earlier snapshot.
    pub fn create_snapshot(
        &mut self,
        month: YearMonth,
        today: NaiveDate,
        engine: &LedgerEngine,
        fx: &dyn FxConverter,
    ) -> LedgerResult<Snapshot> {
        if month > YearMonth::of(today) {
            return Err(LedgerError::validation(format!(
                "cannot snapshot future month {}",
                month
            )));
        }
        let currency = engine.base_currency();
        let worth = build_net_worth(engine, &self.accounts, month.last_day(), currency, fx)?;

        let mut totals_by_nature = BTreeMap::new();
        totals_by_nature.insert(AccountNature::Asset, worth.assets.clone());
        totals_by_nature.insert(AccountNature::Liability, worth.liabilities.clone());
        let snapshot = Snapshot {
            month,
            net_worth_base: worth.net_worth,
            totals_by_nature,
            account_snapshots: worth
                .lines
                .into_iter()
                .map(|line| AccountSnapshot {
                    account_id: line.account_id,
                    name: line.name,
                    source: line.source,
                    nature: line.nature,
                    balance: line.balance,
                    included: line.included,
                })
                .collect(),
            created_at: Utc::now(),
        };

        self.store.save_snapshot(&self.owner, &snapshot)?;
        match self.snapshots.iter_mut().find(|s| s.month == month) {
            Some(existing) => *existing = snapshot.clone(),
            None => {
                self.snapshots.push(snapshot.clone());
                self.snapshots.sort_by_key(|s| s.month);
            }
        }
        info!(owner = %self.owner, %month, net_worth = %snapshot.net_worth_base, "snapshot written");
        Ok(snapshot)
    }

    /// Oldest month first.
    pub fn list_snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn get_snapshot(&self, month: YearMonth) -> Option<&Snapshot> {
        self.snapshots.iter().find(|snapshot| snapshot.month == month)
    }

    pub fn delete_snapshot(&mut self, month: YearMonth) -> LedgerResult<()> {
        let index = self
            .snapshots
            .iter()
            .position(|snapshot| snapshot.month == month)
            .ok_or_else(|| LedgerError::not_found(format!("snapshot {}", month)))?;
        self.store.delete_snapshot(&self.owner, month)?;
        self.snapshots.remove(index);
        Ok(())
    }

    fn index_of(&self, id: Uuid) -> LedgerResult<usize> {
        self.accounts
            .iter()
            .position(|account| account.id == id)
            .ok_or_else(|| LedgerError::not_found(format!("external account {}", id)))
    }
}

fn validate_account(account: &ExternalAccount) -> LedgerResult<()> {
    if account.name.trim().is_empty() {
        return Err(LedgerError::validation("external account name must not be empty"));
    }
    if account.balance.currency() != &account.currency {
        return Err(LedgerError::CurrencyMismatch {
            left: account.currency.to_string(),
            right: account.balance.currency().to_string(),
        });
    }
    Ok(())
}
