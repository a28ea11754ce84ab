//! Double-entry transactions, their postings, and the drafts used to create them.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::EntrySide;
use crate::currency::{CurrencyCode, Money};
use crate::errors::{LedgerError, LedgerResult};

/// One leg of a transaction against a single account.
///
/// `original` is in the posting's native currency; `booked` is frozen in the
/// transaction's base currency when the transaction is written and never
/// revalued afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Posting {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub side: EntrySide,
    pub original: Money,
    pub booked: Money,
}

impl Posting {
    pub fn currency(&self) -> &CurrencyCode {
        self.original.currency()
    }

    pub fn original_debit(&self) -> Option<&Money> {
        (self.side == EntrySide::Debit).then_some(&self.original)
    }

    pub fn original_credit(&self) -> Option<&Money> {
        (self.side == EntrySide::Credit).then_some(&self.original)
    }

    pub fn booked_debit(&self) -> Option<&Money> {
        (self.side == EntrySide::Debit).then_some(&self.booked)
    }

    pub fn booked_credit(&self) -> Option<&Money> {
        (self.side == EntrySide::Credit).then_some(&self.booked)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub base_currency: CurrencyCode,
    pub postings: Vec<Posting>,
    /// Monotonic creation order within the owning ledger.
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn total_debits(&self) -> LedgerResult<Money> {
        Money::sum(
            &self.base_currency,
            self.postings.iter().filter_map(Posting::booked_debit),
        )
    }

    pub fn total_credits(&self) -> LedgerResult<Money> {
        Money::sum(
            &self.base_currency,
            self.postings.iter().filter_map(Posting::booked_credit),
        )
    }

    pub fn touches(&self, account_id: Uuid) -> bool {
        self.postings.iter().any(|p| p.account_id == account_id)
    }

    /// Newest first: date descending, then creation order descending.
    pub fn feed_order(a: &Transaction, b: &Transaction) -> Ordering {
        b.date.cmp(&a.date).then_with(|| b.sequence.cmp(&a.sequence))
    }
}

/// Input for one posting; the engine assigns identity and books the amount.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostingDraft {
    pub account_id: Uuid,
    pub side: EntrySide,
    pub amount: Money,
    /// Explicit base-currency amount for foreign-currency postings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked: Option<Money>,
}

impl PostingDraft {
    pub fn debit(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            side: EntrySide::Debit,
            amount,
            booked: None,
        }
    }

    pub fn credit(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            side: EntrySide::Credit,
            amount,
            booked: None,
        }
    }

    pub fn booked_as(mut self, booked: Money) -> Self {
        self.booked = Some(booked);
        self
    }
}

/// Full replacement payload for creating or updating a transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionDraft {
    pub date: NaiveDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Defaults to the ledger's base currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_currency: Option<CurrencyCode>,
    pub postings: Vec<PostingDraft>,
}

impl TransactionDraft {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            date,
            description: description.into(),
            memo: None,
            reference: None,
            tags: Vec::new(),
            base_currency: None,
            postings: Vec::new(),
        }
    }

    pub fn debit(mut self, account_id: Uuid, amount: Money) -> Self {
        self.postings.push(PostingDraft::debit(account_id, amount));
        self
    }

    pub fn credit(mut self, account_id: Uuid, amount: Money) -> Self {
        self.postings.push(PostingDraft::credit(account_id, amount));
        self
    }

    pub fn posting(mut self, posting: PostingDraft) -> Self {
        self.postings.push(posting);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn in_currency(mut self, base_currency: CurrencyCode) -> Self {
        self.base_currency = Some(base_currency);
        self
    }
}

/// Checks exact debit/credit equality of booked amounts, in minor units.
pub fn ensure_balanced(base_currency: &CurrencyCode, postings: &[Posting]) -> LedgerResult<()> {
    let debits = Money::sum(base_currency, postings.iter().filter_map(Posting::booked_debit))?;
    let credits = Money::sum(base_currency, postings.iter().filter_map(Posting::booked_credit))?;
    if debits != credits {
        return Err(LedgerError::UnbalancedTransaction {
            debits: debits.to_string(),
            credits: credits.to_string(),
        });
    }
    Ok(())
}

/// Query filters for `LedgerEngine::get_transactions`; every set field must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TransactionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn for_account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn describing(mut self, needle: impl Into<String>) -> Self {
        self.description = Some(needle.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if self.from.is_some_and(|from| txn.date < from) {
            return false;
        }
        if self.to.is_some_and(|to| txn.date > to) {
            return false;
        }
        if self.account_id.is_some_and(|id| !txn.touches(id)) {
            return false;
        }
        if let Some(needle) = &self.description {
            if !txn
                .description
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(reference) = &self.reference {
            if txn.reference.as_deref() != Some(reference.as_str()) {
                return false;
            }
        }
        self.tags.iter().all(|tag| txn.tags.contains(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mxn(minor: i64) -> Money {
        Money::from_minor(minor, CurrencyCode::new("MXN"))
    }

    fn posting(side: EntrySide, minor: i64) -> Posting {
        Posting {
            id: Uuid::new_v4(),
            transaction_id: Uuid::nil(),
            account_id: Uuid::new_v4(),
            side,
            original: mxn(minor),
            booked: mxn(minor),
        }
    }

    #[test]
    fn exactly_one_side_is_populated() {
        let debit = posting(EntrySide::Debit, 100);
        assert!(debit.booked_debit().is_some());
        assert!(debit.booked_credit().is_none());
        assert!(debit.original_credit().is_none());
    }

    #[test]
    fn one_cent_difference_is_unbalanced() {
        let postings = vec![posting(EntrySide::Debit, 10000), posting(EntrySide::Credit, 9999)];
        let err = ensure_balanced(&CurrencyCode::new("MXN"), &postings).expect_err("unbalanced");
        assert!(matches!(err, LedgerError::UnbalancedTransaction { .. }));
    }

    #[test]
    fn split_postings_balance() {
        let postings = vec![
            posting(EntrySide::Debit, 6000),
            posting(EntrySide::Debit, 4000),
            posting(EntrySide::Credit, 10000),
        ];
        assert!(ensure_balanced(&CurrencyCode::new("MXN"), &postings).is_ok());
    }
}
