//! Expense shares and the savings-potential heuristic.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classify::ExpenseClassifier;
use crate::{
    currency::{CurrencyCode, FxConverter, Money},
    errors::{LedgerError, LedgerResult},
    ledger::LedgerEngine,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseShare {
    pub account_id: Uuid,
    pub name: String,
    pub amount: Money,
    /// Percentage of total expenses, 0–100.
    pub share: f64,
    pub essential: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseBreakdown {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub currency: CurrencyCode,
    pub total: Money,
    /// Largest first.
    pub lines: Vec<ExpenseShare>,
}

pub fn build_expense_breakdown(
    engine: &LedgerEngine,
    from: NaiveDate,
    to: NaiveDate,
    currency: &CurrencyCode,
    fx: &dyn FxConverter,
    classifier: &dyn ExpenseClassifier,
) -> LedgerResult<ExpenseBreakdown> {
    let statement = engine.get_income_statement(from, to, currency, fx)?;
    let total = statement.expenses.total.clone();
    let mut lines = Vec::with_capacity(statement.expenses.lines.len());
    for line in statement.expenses.lines {
        let Some(account_id) = line.account_id else {
            continue;
        };
        let account = engine.get_account(account_id)?;
        lines.push(ExpenseShare {
            account_id,
            name: line.name,
            share: percentage(&line.amount, &total),
            essential: classifier.is_essential(account),
            amount: line.amount,
        });
    }
    lines.sort_by(|a, b| {
        b.amount
            .amount_minor()
            .cmp(&a.amount.amount_minor())
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(ExpenseBreakdown {
        from,
        to,
        currency: currency.clone(),
        total,
        lines,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavingsPotential {
    pub income: Money,
    pub expenses: Money,
    pub net_savings: Money,
    /// Net savings as a percentage of income; zero without income.
    pub savings_rate: f64,
    pub essential: Money,
    pub non_essential: Money,
    pub potential_savings: Money,
}

pub fn build_savings_potential(
    engine: &LedgerEngine,
    from: NaiveDate,
    to: NaiveDate,
    currency: &CurrencyCode,
    fx: &dyn FxConverter,
    classifier: &dyn ExpenseClassifier,
    savings_factor: f64,
) -> LedgerResult<SavingsPotential> {
    if !(0.0..=1.0).contains(&savings_factor) {
        return Err(LedgerError::validation(format!(
            "savings factor must be between 0 and 1 (got {})",
            savings_factor
        )));
    }
    let statement = engine.get_income_statement(from, to, currency, fx)?;
    let breakdown = build_expense_breakdown(engine, from, to, currency, fx, classifier)?;
    let essential = Money::sum(
        currency,
        breakdown.lines.iter().filter(|l| l.essential).map(|l| &l.amount),
    )?;
    let non_essential = Money::sum(
        currency,
        breakdown.lines.iter().filter(|l| !l.essential).map(|l| &l.amount),
    )?;
    Ok(SavingsPotential {
        savings_rate: percentage(&statement.net_income, &statement.income.total),
        income: statement.income.total,
        expenses: statement.expenses.total,
        net_savings: statement.net_income,
        potential_savings: non_essential.multiply(savings_factor)?,
        essential,
        non_essential,
    })
}

fn percentage(part: &Money, whole: &Money) -> f64 {
    if whole.is_zero() {
        return 0.0;
    }
    part.amount_minor() as f64 / whole.amount_minor() as f64 * 100.0
}
