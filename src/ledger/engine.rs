//! System of record for one owner's accounts and transactions.
//!
//! Every balance is re-derived from the full transaction log on each query.
//! Writes reach the store before in-memory state changes, so a rejected or
//! failed write leaves the engine exactly as it was.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    account::{standard_chart, Account, AccountDraft, AccountNature, AccountUpdate, EntrySide},
    external::ExternalAccount,
    transaction::{
        ensure_balanced, Posting, PostingDraft, Transaction, TransactionDraft, TransactionFilter,
    },
    OwnerId,
};
use crate::{
    currency::{CurrencyCode, FxConverter, FxTable, Money},
    errors::{LedgerError, LedgerResult},
    reports::statements::{BalanceSheet, IncomeStatement, StatementLine, TrialBalance},
    storage::LedgerStore,
};

/// An account paired with its balance, signed so that positive means the
/// balance sits on the account's normal side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountBalance {
    pub account: Account,
    pub balance: Money,
}

pub struct LedgerEngine {
    owner: OwnerId,
    base_currency: CurrencyCode,
    accounts: HashMap<Uuid, Account>,
    transactions: Vec<Transaction>,
    store: Box<dyn LedgerStore>,
    next_sequence: u64,
}

impl LedgerEngine {
    pub fn open(
        owner: OwnerId,
        base_currency: CurrencyCode,
        store: Box<dyn LedgerStore>,
    ) -> LedgerResult<Self> {
        let accounts = store
            .load_accounts(&owner)?
            .into_iter()
            .map(|account| (account.id, account))
            .collect::<HashMap<_, _>>();
        let transactions = store.load_transactions(&owner, &TransactionFilter::all())?;
        let next_sequence = transactions
            .iter()
            .map(|txn| txn.sequence + 1)
            .max()
            .unwrap_or(0);
        info!(
            owner = %owner,
            accounts = accounts.len(),
            transactions = transactions.len(),
            "ledger opened"
        );
        Ok(Self {
            owner,
            base_currency,
            accounts,
            transactions,
            store,
            next_sequence,
        })
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        &self.base_currency
    }

    /// Raw transaction log in insertion order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Creates any standard chart account whose code is not yet in use.
    pub fn seed_standard_chart(&mut self) -> LedgerResult<Vec<Account>> {
        let mut created = Vec::new();
        for draft in standard_chart() {
            if self.accounts.values().any(|a| a.code == draft.code) {
                continue;
            }
            created.push(self.create_account(draft)?);
        }
        Ok(created)
    }

    pub fn create_account(&mut self, draft: AccountDraft) -> LedgerResult<Account> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(LedgerError::validation("account name must not be empty"));
        }
        let code = draft.code.trim();
        self.ensure_code_free(code, None)?;
        let account = Account::new(code, name, draft.nature);
        self.store.save_account(&self.owner, &account)?;
        info!(owner = %self.owner, account = %account.display_label(), nature = %account.nature, "account created");
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    pub fn update_account(&mut self, id: Uuid, update: AccountUpdate) -> LedgerResult<Account> {
        let mut account = self.get_account(id)?.clone();
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(LedgerError::validation("account name must not be empty"));
            }
            account.name = name.to_string();
        }
        if let Some(code) = update.code {
            let code = code.trim();
            self.ensure_code_free(code, Some(id))?;
            account.code = code.to_string();
        }
        if let Some(nature) = update.nature {
            self.ensure_nature_change_allowed(&account, nature)?;
            account.nature = nature;
        }
        account.touch();
        self.persist_account(account)
    }

    /// Soft delete: the account keeps its history but refuses new postings.
    pub fn deactivate_account(&mut self, id: Uuid) -> LedgerResult<Account> {
        self.set_active(id, false)
    }

    pub fn reactivate_account(&mut self, id: Uuid) -> LedgerResult<Account> {
        self.set_active(id, true)
    }

    pub fn get_account(&self, id: Uuid) -> LedgerResult<&Account> {
        self.accounts
            .get(&id)
            .ok_or_else(|| LedgerError::not_found(format!("account {}", id)))
    }

    /// All accounts ordered by code, then name.
    pub fn get_accounts(&self) -> Vec<&Account> {
        let mut accounts: Vec<&Account> = self.accounts.values().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.name.cmp(&b.name)));
        accounts
    }

    pub fn get_accounts_by_nature(&self, nature: AccountNature) -> Vec<&Account> {
        self.get_accounts()
            .into_iter()
            .filter(|account| account.nature == nature)
            .collect()
    }

    pub fn find_account_by_code(&self, code: &str) -> Option<&Account> {
        self.accounts.values().find(|account| account.code == code)
    }

    /// Mirrors a manually tracked account into the chart, keyed by its id.
    /// Name and nature follow the external account on every call; a nature
    /// change is refused once the mirror has postings.
    pub fn sync_external_account(&mut self, external: &ExternalAccount) -> LedgerResult<Account> {
        let nature = external.nature();
        let existing = self
            .accounts
            .values()
            .find(|account| account.external_id == Some(external.id))
            .cloned();
        match existing {
            Some(mut account) => {
                if account.name == external.name && account.nature == nature {
                    return Ok(account);
                }
                if let Err(err) = self.ensure_nature_change_allowed(&account, nature) {
                    warn!(
                        owner = %self.owner,
                        external = %external.id,
                        kind = ?external.kind,
                        "external account kind change refused"
                    );
                    return Err(err);
                }
                account.name = external.name.clone();
                account.nature = nature;
                account.touch();
                debug!(owner = %self.owner, external = %external.id, "external account drifted, updating mirror");
                self.persist_account(account)
            }
            None => {
                let mut account = Account::new("", external.name.clone(), nature);
                account.external_id = Some(external.id);
                self.store.save_account(&self.owner, &account)?;
                info!(owner = %self.owner, external = %external.id, "external account mirrored");
                self.accounts.insert(account.id, account.clone());
                Ok(account)
            }
        }
    }

    /// Validates and appends a transaction whose postings are all in the
    /// ledger currency or carry an explicit booked amount.
    pub fn add_transaction(&mut self, draft: TransactionDraft) -> LedgerResult<Transaction> {
        self.add(draft, None)
    }

    /// Same as [`LedgerEngine::add_transaction`], booking foreign postings at
    /// the table's rate on the transaction date.
    pub fn add_transaction_with_fx(
        &mut self,
        draft: TransactionDraft,
        fx: &FxTable,
    ) -> LedgerResult<Transaction> {
        self.add(draft, Some(fx))
    }

    /// Replaces the transaction's fields and full posting set.
    pub fn update_transaction(
        &mut self,
        id: Uuid,
        draft: TransactionDraft,
    ) -> LedgerResult<Transaction> {
        self.update(id, draft, None)
    }

    pub fn update_transaction_with_fx(
        &mut self,
        id: Uuid,
        draft: TransactionDraft,
        fx: &FxTable,
    ) -> LedgerResult<Transaction> {
        self.update(id, draft, Some(fx))
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> LedgerResult<()> {
        let index = self.position(id)?;
        self.store.delete_transaction(&self.owner, id)?;
        self.transactions.remove(index);
        info!(owner = %self.owner, transaction = %id, "transaction deleted");
        Ok(())
    }

    pub fn get_transaction(&self, id: Uuid) -> LedgerResult<&Transaction> {
        let index = self.position(id)?;
        Ok(&self.transactions[index])
    }

    /// Matching transactions, newest first with creation order breaking ties.
    pub fn get_transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        let mut matches: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|txn| filter.matches(txn))
            .cloned()
            .collect();
        matches.sort_by(Transaction::feed_order);
        debug!(owner = %self.owner, results = matches.len(), "transactions queried");
        matches
    }

    pub fn get_account_balance(&self, id: Uuid, as_of: NaiveDate) -> LedgerResult<Money> {
        let account = self.get_account(id)?;
        let mut net = Money::zero(self.base_currency.clone());
        for posting in self.postings_through(as_of).filter(|p| p.account_id == id) {
            net = match posting.side {
                EntrySide::Debit => net.add(&posting.booked)?,
                EntrySide::Credit => net.subtract(&posting.booked)?,
            };
        }
        natural_sign(account.nature, net)
    }

    /// Balance of every account as of `as_of`, ordered by code.
    pub fn get_all_account_balances(&self, as_of: NaiveDate) -> LedgerResult<Vec<AccountBalance>> {
        let mut nets: HashMap<Uuid, Money> = HashMap::new();
        for posting in self.postings_through(as_of) {
            let net = nets
                .entry(posting.account_id)
                .or_insert_with(|| Money::zero(self.base_currency.clone()));
            *net = match posting.side {
                EntrySide::Debit => net.add(&posting.booked)?,
                EntrySide::Credit => net.subtract(&posting.booked)?,
            };
        }
        self.get_accounts()
            .into_iter()
            .map(|account| {
                let net = nets
                    .remove(&account.id)
                    .unwrap_or_else(|| Money::zero(self.base_currency.clone()));
                Ok(AccountBalance {
                    account: account.clone(),
                    balance: natural_sign(account.nature, net)?,
                })
            })
            .collect()
    }

    pub fn get_trial_balance(&self, as_of: NaiveDate) -> LedgerResult<TrialBalance> {
        let balances = self.get_all_account_balances(as_of)?;
        let trial = TrialBalance::from_balances(as_of, &self.base_currency, &balances)?;
        if !trial.is_balanced {
            warn!(
                owner = %self.owner,
                debits = %trial.total_debits,
                credits = %trial.total_credits,
                "trial balance does not balance"
            );
        }
        Ok(trial)
    }

    /// Stock view of asset, liability and equity accounts, displayed in
    /// `currency` through `fx`.
    pub fn get_balance_sheet(
        &self,
        as_of: NaiveDate,
        currency: &CurrencyCode,
        fx: &dyn FxConverter,
    ) -> LedgerResult<BalanceSheet> {
        let balances = self.get_all_account_balances(as_of)?;
        let sheet =
            BalanceSheet::from_balances(as_of, &self.base_currency, &balances, currency, fx)?;
        debug!(owner = %self.owner, %as_of, balanced = sheet.is_balanced, "balance sheet built");
        Ok(sheet)
    }

    /// Flow view of income and expense activity within `[from, to]`, each
    /// posting's original amount converted to `currency` at query time.
    pub fn get_income_statement(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        currency: &CurrencyCode,
        fx: &dyn FxConverter,
    ) -> LedgerResult<IncomeStatement> {
        let activity = self.flow_activity(from, to, currency, fx)?;
        let mut income = Vec::new();
        let mut expenses = Vec::new();
        for (account_id, amount) in activity {
            let account = self.get_account(account_id)?;
            let line = StatementLine {
                account_id: Some(account_id),
                code: account.code.clone(),
                name: account.name.clone(),
                amount,
            };
            match account.nature {
                AccountNature::Income => income.push(line),
                _ => expenses.push(line),
            }
        }
        IncomeStatement::from_activity(from, to, currency, income, expenses)
    }

    /// Converted, naturally signed activity of income and expense accounts
    /// within `[from, to]`.
    pub(crate) fn flow_activity(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        currency: &CurrencyCode,
        fx: &dyn FxConverter,
    ) -> LedgerResult<HashMap<Uuid, Money>> {
        if from > to {
            return Err(LedgerError::validation(format!(
                "period start {} is after end {}",
                from, to
            )));
        }
        let mut activity: HashMap<Uuid, Money> = HashMap::new();
        for txn in self
            .transactions
            .iter()
            .filter(|txn| txn.date >= from && txn.date <= to)
        {
            for posting in &txn.postings {
                let account = self.get_account(posting.account_id)?;
                if account.nature.is_balance_sheet() {
                    continue;
                }
                let amount = fx.convert(&posting.original, currency)?;
                let signed = if posting.side == account.nature.normal_side() {
                    amount
                } else {
                    amount.negate()?
                };
                let slot = activity
                    .entry(account.id)
                    .or_insert_with(|| Money::zero(currency.clone()));
                *slot = slot.add(&signed)?;
            }
        }
        Ok(activity)
    }

    fn add(&mut self, draft: TransactionDraft, fx: Option<&FxTable>) -> LedgerResult<Transaction> {
        let now = Utc::now();
        let built = self.build_transaction(Uuid::new_v4(), draft, fx).map(|mut txn| {
            txn.sequence = self.next_sequence;
            txn.created_at = now;
            txn.updated_at = now;
            txn
        });
        let txn = self.log_rejection(built, None)?;
        self.store.save_transaction(&self.owner, &txn)?;
        self.next_sequence += 1;
        self.transactions.push(txn.clone());
        info!(
            owner = %self.owner,
            transaction = %txn.id,
            date = %txn.date,
            postings = txn.postings.len(),
            "transaction added"
        );
        Ok(txn)
    }

    fn update(
        &mut self,
        id: Uuid,
        draft: TransactionDraft,
        fx: Option<&FxTable>,
    ) -> LedgerResult<Transaction> {
        let index = self.position(id)?;
        let existing = &self.transactions[index];
        let (sequence, created_at) = (existing.sequence, existing.created_at);
        let built = self.build_transaction(id, draft, fx).map(|mut txn| {
            txn.sequence = sequence;
            txn.created_at = created_at;
            txn.updated_at = Utc::now();
            txn
        });
        let txn = self.log_rejection(built, Some(id))?;
        self.store.save_transaction(&self.owner, &txn)?;
        self.transactions[index] = txn.clone();
        info!(owner = %self.owner, transaction = %id, "transaction updated");
        Ok(txn)
    }

    fn log_rejection(
        &self,
        result: LedgerResult<Transaction>,
        id: Option<Uuid>,
    ) -> LedgerResult<Transaction> {
        result.map_err(|err| {
            warn!(owner = %self.owner, transaction = ?id, error = %err, "transaction rejected");
            err
        })
    }

    /// Turns a draft into a fully booked, validated transaction. Identity
    /// fields other than `id` are filled in by the caller.
    fn build_transaction(
        &self,
        id: Uuid,
        draft: TransactionDraft,
        fx: Option<&FxTable>,
    ) -> LedgerResult<Transaction> {
        if draft.postings.len() < 2 {
            return Err(LedgerError::validation(
                "a transaction needs at least two postings",
            ));
        }
        for posting in &draft.postings {
            if !posting.amount.is_positive() {
                return Err(LedgerError::validation(format!(
                    "posting amounts must be positive (got {})",
                    posting.amount
                )));
            }
        }
        for posting in &draft.postings {
            let account = self.get_account(posting.account_id)?;
            if !account.is_active {
                return Err(LedgerError::validation(format!(
                    "account `{}` is inactive",
                    account.display_label()
                )));
            }
        }
        let base = draft
            .base_currency
            .clone()
            .unwrap_or_else(|| self.base_currency.clone());
        if base != self.base_currency {
            return Err(LedgerError::validation(format!(
                "transaction currency {} differs from ledger currency {}",
                base, self.base_currency
            )));
        }
        let postings = draft
            .postings
            .into_iter()
            .map(|posting| self.book_posting(id, posting, &base, draft.date, fx))
            .collect::<LedgerResult<Vec<_>>>()?;
        let description = draft.description.trim().to_string();
        if description.is_empty() {
            return Err(LedgerError::validation(
                "transaction description must not be empty",
            ));
        }
        ensure_balanced(&base, &postings)?;

        let now = Utc::now();
        Ok(Transaction {
            id,
            date: draft.date,
            description,
            memo: draft.memo.filter(|memo| !memo.trim().is_empty()),
            reference: draft.reference.filter(|r| !r.trim().is_empty()),
            tags: draft.tags,
            base_currency: base,
            postings,
            sequence: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn book_posting(
        &self,
        transaction_id: Uuid,
        draft: PostingDraft,
        base: &CurrencyCode,
        date: NaiveDate,
        fx: Option<&FxTable>,
    ) -> LedgerResult<Posting> {
        let booked = match (draft.booked, fx) {
            (Some(booked), _) => booked,
            (None, _) if draft.amount.currency() == base => draft.amount.clone(),
            (None, Some(table)) => table.convert(&draft.amount, base, date)?,
            (None, None) => {
                return Err(LedgerError::validation(format!(
                    "posting in {} needs a booked amount in {}",
                    draft.amount.currency(),
                    base
                )))
            }
        };
        if booked.currency() != base {
            return Err(LedgerError::validation(format!(
                "booked amount must be in {} (got {})",
                base,
                booked.currency()
            )));
        }
        if !booked.is_positive() {
            return Err(LedgerError::validation(format!(
                "booked amounts must be positive (got {})",
                booked
            )));
        }
        Ok(Posting {
            id: Uuid::new_v4(),
            transaction_id,
            account_id: draft.account_id,
            side: draft.side,
            original: draft.amount,
            booked,
        })
    }

    fn postings_through(&self, as_of: NaiveDate) -> impl Iterator<Item = &Posting> {
        self.transactions
            .iter()
            .filter(move |txn| txn.date <= as_of)
            .flat_map(|txn| txn.postings.iter())
    }

    fn position(&self, id: Uuid) -> LedgerResult<usize> {
        self.transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or_else(|| LedgerError::not_found(format!("transaction {}", id)))
    }

    fn ensure_nature_change_allowed(
        &self,
        account: &Account,
        nature: AccountNature,
    ) -> LedgerResult<()> {
        if nature != account.nature && self.transactions.iter().any(|t| t.touches(account.id)) {
            return Err(LedgerError::validation(format!(
                "account `{}` has postings; its nature cannot change",
                account.name
            )));
        }
        Ok(())
    }

    fn ensure_code_free(&self, code: &str, except: Option<Uuid>) -> LedgerResult<()> {
        if code.is_empty() {
            return Ok(());
        }
        let taken = self
            .accounts
            .values()
            .any(|account| account.code == code && Some(account.id) != except);
        if taken {
            return Err(LedgerError::validation(format!(
                "account code `{}` is already in use",
                code
            )));
        }
        Ok(())
    }

    fn set_active(&mut self, id: Uuid, active: bool) -> LedgerResult<Account> {
        let mut account = self.get_account(id)?.clone();
        if account.is_active == active {
            return Ok(account);
        }
        account.is_active = active;
        account.touch();
        let account = self.persist_account(account)?;
        info!(owner = %self.owner, account = %account.display_label(), active, "account activity changed");
        Ok(account)
    }

    fn persist_account(&mut self, account: Account) -> LedgerResult<Account> {
        self.store.save_account(&self.owner, &account)?;
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

/// Converts a debit-minus-credit net into the account's natural sign.
fn natural_sign(nature: AccountNature, net: Money) -> LedgerResult<Money> {
    match nature.normal_side() {
        EntrySide::Debit => Ok(net),
        EntrySide::Credit => net.negate(),
    }
}
