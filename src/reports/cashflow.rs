use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classify::CashAccountClassifier;
use crate::{
    currency::{CurrencyCode, FxConverter, Money},
    errors::{LedgerError, LedgerResult},
    ledger::{AccountNature, EntrySide, LedgerEngine, Posting},
};

/// Where a cash movement came from or went to, judged by its counterparty.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowCategory {
    Income,
    Expense,
    LiabilityTransfer,
    Transfer,
    /// Both legs are cash-like; listed but never totalled.
    Internal,
}

impl fmt::Display for CashFlowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CashFlowCategory::Income => "Income",
            CashFlowCategory::Expense => "Expense",
            CashFlowCategory::LiabilityTransfer => "Liability transfer",
            CashFlowCategory::Transfer => "Transfer",
            CashFlowCategory::Internal => "Internal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowDirection {
    Inflow,
    Outflow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashFlowEntry {
    pub transaction_id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    pub cash_account_id: Uuid,
    pub cash_account: String,
    pub counterparty: Option<String>,
    pub category: CashFlowCategory,
    pub direction: FlowDirection,
    pub amount: Money,
    #[serde(skip)]
    sequence: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashFlowStatement {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub currency: CurrencyCode,
    pub inflows: Money,
    pub outflows: Money,
    pub net: Money,
    /// Newest first.
    pub entries: Vec<CashFlowEntry>,
}

impl CashFlowStatement {
    pub fn total_for(&self, category: CashFlowCategory, direction: FlowDirection) -> LedgerResult<Money> {
        Money::sum(
            &self.currency,
            self.entries
                .iter()
                .filter(|e| e.category == category && e.direction == direction)
                .map(|e| &e.amount),
        )
    }
}

pub fn build_cash_flow(
    engine: &LedgerEngine,
    from: NaiveDate,
    to: NaiveDate,
    currency: &CurrencyCode,
    fx: &dyn FxConverter,
    classifier: &dyn CashAccountClassifier,
) -> LedgerResult<CashFlowStatement> {
    if from > to {
        return Err(LedgerError::validation(format!(
            "period start {} is after end {}",
            from, to
        )));
    }
    let zero = Money::zero(currency.clone());
    let (mut inflows, mut outflows) = (zero.clone(), zero.clone());
    let mut entries = Vec::new();

    for txn in engine
        .transactions()
        .iter()
        .filter(|txn| txn.date >= from && txn.date <= to)
    {
        let mut cash = Vec::new();
        let mut others = Vec::new();
        for posting in &txn.postings {
            let account = engine.get_account(posting.account_id)?;
            if classifier.is_cash_like(account) {
                cash.push(posting);
            } else {
                others.push(posting);
            }
        }
        if cash.is_empty() {
            continue;
        }

        let counterparty = dominant(&others);
        let category = match counterparty {
            None => CashFlowCategory::Internal,
            Some(posting) => match engine.get_account(posting.account_id)?.nature {
                AccountNature::Income => CashFlowCategory::Income,
                AccountNature::Expense => CashFlowCategory::Expense,
                AccountNature::Liability => CashFlowCategory::LiabilityTransfer,
                AccountNature::Asset | AccountNature::Equity => CashFlowCategory::Transfer,
            },
        };
        let counterparty_name = counterparty
            .map(|posting| engine.get_account(posting.account_id).map(|a| a.name.clone()))
            .transpose()?;

        for posting in cash {
            let amount = fx.convert(&posting.original, currency)?;
            let direction = match posting.side {
                EntrySide::Debit => FlowDirection::Inflow,
                EntrySide::Credit => FlowDirection::Outflow,
            };
            if category != CashFlowCategory::Internal {
                match direction {
                    FlowDirection::Inflow => inflows = inflows.add(&amount)?,
                    FlowDirection::Outflow => outflows = outflows.add(&amount)?,
                }
            }
            entries.push(CashFlowEntry {
                transaction_id: txn.id,
                date: txn.date,
                description: txn.description.clone(),
                cash_account_id: posting.account_id,
                cash_account: engine.get_account(posting.account_id)?.name.clone(),
                counterparty: counterparty_name.clone(),
                category,
                direction,
                amount,
                sequence: txn.sequence,
            });
        }
    }

    entries.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.sequence.cmp(&a.sequence))
    });
    let net = inflows.subtract(&outflows)?;
    tracing::debug!(owner = %engine.owner(), entries = entries.len(), "cash flow built");
    Ok(CashFlowStatement {
        from,
        to,
        currency: currency.clone(),
        inflows,
        outflows,
        net,
        entries,
    })
}

/// The non-cash leg carrying the largest booked amount.
fn dominant<'a>(postings: &[&'a Posting]) -> Option<&'a Posting> {
    postings
        .iter()
        .copied()
        .max_by_key(|posting| posting.booked.amount_minor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ledger::{OwnerId, TransactionDraft},
        reports::classify::KeywordClassifier,
        storage::MemoryStore,
    };

    fn mxn(minor: i64) -> Money {
        Money::from_minor(minor, CurrencyCode::new("MXN"))
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    #[test]
    fn classifies_by_counterparty_and_skips_internal_totals() {
        let mut engine = LedgerEngine::open(
            OwnerId::new("ana"),
            CurrencyCode::new("MXN"),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        engine.seed_standard_chart().unwrap();
        let id = |code: &str| engine.find_account_by_code(code).unwrap().id;
        let (checking, savings, salary, rent, card) =
            (id("1010"), id("1020"), id("4000"), id("5000"), id("2000"));
        let drafts = vec![
            TransactionDraft::new(date(1), "Payroll")
                .debit(checking, mxn(3_000_000))
                .credit(salary, mxn(3_000_000)),
            TransactionDraft::new(date(2), "Rent")
                .debit(rent, mxn(1_000_000))
                .credit(checking, mxn(1_000_000)),
            TransactionDraft::new(date(3), "Card payment")
                .debit(card, mxn(200_000))
                .credit(checking, mxn(200_000)),
            TransactionDraft::new(date(4), "Move to savings")
                .debit(savings, mxn(500_000))
                .credit(checking, mxn(500_000)),
        ];
        for draft in drafts {
            engine.add_transaction(draft).unwrap();
        }

        let identity = |amount: &Money, _to: &CurrencyCode| -> LedgerResult<Money> { Ok(amount.clone()) };
        let statement = build_cash_flow(
            &engine,
            date(1),
            date(31),
            &CurrencyCode::new("MXN"),
            &identity,
            &KeywordClassifier::default(),
        )
        .unwrap();

        assert_eq!(statement.inflows, mxn(3_000_000));
        assert_eq!(statement.outflows, mxn(1_200_000));
        assert_eq!(statement.net, mxn(1_800_000));
        assert_eq!(statement.entries[0].category, CashFlowCategory::Internal);
        assert_eq!(statement.entries[0].date, date(4));
        assert_eq!(
            statement
                .total_for(CashFlowCategory::LiabilityTransfer, FlowDirection::Outflow)
                .unwrap(),
            mxn(200_000)
        );
        assert_eq!(statement.entries.last().unwrap().category, CashFlowCategory::Income);
    }
}
