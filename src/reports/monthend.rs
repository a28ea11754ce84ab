use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    currency::{CurrencyCode, FxConverter, Money},
    errors::LedgerResult,
    ledger::{ExternalAccount, ExternalAccountKind},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Paydown,
    Review,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthEndLine {
    pub account_id: Uuid,
    pub name: String,
    pub kind: ExternalAccountKind,
    /// Converted; liabilities are positive magnitudes.
    pub balance: Money,
    pub action: RecommendedAction,
    pub due_date: Option<NaiveDate>,
    pub min_payment: Option<Money>,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthEndSummary {
    pub currency: CurrencyCode,
    pub cash: Vec<MonthEndLine>,
    pub liabilities: Vec<MonthEndLine>,
    pub total_cash: Money,
    pub total_liabilities: Money,
    /// Cash left after settling every listed liability.
    pub net_position: Money,
}

enum Bucket {
    Cash,
    Liability,
}

fn bucket_for(kind: ExternalAccountKind) -> Option<Bucket> {
    match kind {
        ExternalAccountKind::Checking
        | ExternalAccountKind::Savings
        | ExternalAccountKind::Cash
        | ExternalAccountKind::Investment => Some(Bucket::Cash),
        ExternalAccountKind::CreditCard
        | ExternalAccountKind::Loan
        | ExternalAccountKind::Mortgage
        | ExternalAccountKind::OtherLiability => Some(Bucket::Liability),
        ExternalAccountKind::Property
        | ExternalAccountKind::Vehicle
        | ExternalAccountKind::OtherAsset => None,
    }
}

fn action_for(account: &ExternalAccount) -> RecommendedAction {
    match account.kind {
        kind if kind.is_liability() => {
            if account.metadata.paid || account.balance.is_zero() {
                RecommendedAction::None
            } else {
                RecommendedAction::Paydown
            }
        }
        ExternalAccountKind::Savings | ExternalAccountKind::Investment => RecommendedAction::Review,
        _ => RecommendedAction::None,
    }
}

pub fn build_month_end_summary(
    accounts: &[ExternalAccount],
    currency: &CurrencyCode,
    fx: &dyn FxConverter,
) -> LedgerResult<MonthEndSummary> {
    let mut cash = Vec::new();
    let mut liabilities = Vec::new();
    for account in accounts.iter().filter(|a| !a.exclude_from_total) {
        let Some(bucket) = bucket_for(account.kind) else {
            continue;
        };
        let min_payment = account
            .metadata
            .min_payment
            .as_ref()
            .map(|payment| fx.convert(payment, currency))
            .transpose()?;
        let line = MonthEndLine {
            account_id: account.id,
            name: account.name.clone(),
            kind: account.kind,
            balance: fx.convert(&account.normalized_balance()?, currency)?,
            action: action_for(account),
            due_date: account.metadata.due_date,
            min_payment,
            paid: account.metadata.paid,
        };
        match bucket {
            Bucket::Cash => cash.push(line),
            Bucket::Liability => liabilities.push(line),
        }
    }
    // Soonest due first; undated liabilities go last.
    liabilities.sort_by_key(|line| (line.due_date.is_none(), line.due_date));

    let total_cash = Money::sum(currency, cash.iter().map(|line| &line.balance))?;
    let total_liabilities = Money::sum(currency, liabilities.iter().map(|line| &line.balance))?;
    Ok(MonthEndSummary {
        currency: currency.clone(),
        net_position: total_cash.subtract(&total_liabilities)?,
        cash,
        liabilities,
        total_cash,
        total_liabilities,
    })
}
