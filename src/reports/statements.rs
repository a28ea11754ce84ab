//! Trial balance, balance sheet and income statement view models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    currency::{CurrencyCode, FxConverter, Money},
    errors::LedgerResult,
    ledger::{AccountBalance, AccountNature, EntrySide},
};

pub const CURRENT_EARNINGS_LABEL: &str = "Current earnings";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialBalanceLine {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub nature: AccountNature,
    pub debit: Money,
    pub credit: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialBalance {
    pub as_of: NaiveDate,
    pub currency: CurrencyCode,
    pub lines: Vec<TrialBalanceLine>,
    pub total_debits: Money,
    pub total_credits: Money,
    pub is_balanced: bool,
}

impl TrialBalance {
    /// A balance on the normal side lands in that column; a reversed balance
    /// lands in the opposite column as a magnitude.
    pub fn from_balances(
        as_of: NaiveDate,
        currency: &CurrencyCode,
        balances: &[AccountBalance],
    ) -> LedgerResult<Self> {
        let zero = Money::zero(currency.clone());
        let mut lines = Vec::with_capacity(balances.len());
        let mut total_debits = zero.clone();
        let mut total_credits = zero.clone();
        for entry in balances {
            let side = if entry.balance.is_negative() {
                entry.account.nature.normal_side().opposite()
            } else {
                entry.account.nature.normal_side()
            };
            let magnitude = entry.balance.abs()?;
            let (debit, credit) = match side {
                EntrySide::Debit => (magnitude, zero.clone()),
                EntrySide::Credit => (zero.clone(), magnitude),
            };
            total_debits = total_debits.add(&debit)?;
            total_credits = total_credits.add(&credit)?;
            lines.push(TrialBalanceLine {
                account_id: entry.account.id,
                code: entry.account.code.clone(),
                name: entry.account.name.clone(),
                nature: entry.account.nature,
                debit,
                credit,
            });
        }
        Ok(Self {
            as_of,
            currency: currency.clone(),
            is_balanced: total_debits == total_credits,
            lines,
            total_debits,
            total_credits,
        })
    }
}

/// One account (or synthetic) line in a statement section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementLine {
    /// `None` for synthetic lines such as current earnings.
    pub account_id: Option<Uuid>,
    pub code: String,
    pub name: String,
    pub amount: Money,
}

impl StatementLine {
    fn for_balance(entry: &AccountBalance) -> Self {
        Self {
            account_id: Some(entry.account.id),
            code: entry.account.code.clone(),
            name: entry.account.name.clone(),
            amount: entry.balance.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementSection {
    pub lines: Vec<StatementLine>,
    pub total: Money,
}

impl StatementSection {
    fn from_lines(currency: &CurrencyCode, lines: Vec<StatementLine>) -> LedgerResult<Self> {
        let total = Money::sum(currency, lines.iter().map(|line| &line.amount))?;
        Ok(Self { lines, total })
    }

    fn converted(&self, to: &CurrencyCode, fx: &dyn FxConverter) -> LedgerResult<Self> {
        let lines = self
            .lines
            .iter()
            .map(|line| {
                Ok(StatementLine {
                    amount: fx.convert(&line.amount, to)?,
                    ..line.clone()
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;
        Self::from_lines(to, lines)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub currency: CurrencyCode,
    pub assets: StatementSection,
    pub liabilities: StatementSection,
    pub equity: StatementSection,
    /// Accounting equation checked in the ledger currency, before any display
    /// conversion.
    pub is_balanced: bool,
}

impl BalanceSheet {
    pub fn from_balances(
        as_of: NaiveDate,
        ledger_currency: &CurrencyCode,
        balances: &[AccountBalance],
        currency: &CurrencyCode,
        fx: &dyn FxConverter,
    ) -> LedgerResult<Self> {
        let section_for = |nature: AccountNature| {
            balances
                .iter()
                .filter(|entry| entry.account.nature == nature && !entry.balance.is_zero())
                .map(StatementLine::for_balance)
                .collect::<Vec<_>>()
        };

        let income = Money::sum(
            ledger_currency,
            balances
                .iter()
                .filter(|entry| entry.account.nature == AccountNature::Income)
                .map(|entry| &entry.balance),
        )?;
        let expenses = Money::sum(
            ledger_currency,
            balances
                .iter()
                .filter(|entry| entry.account.nature == AccountNature::Expense)
                .map(|entry| &entry.balance),
        )?;
        let earnings = income.subtract(&expenses)?;

        let mut equity_lines = section_for(AccountNature::Equity);
        if !earnings.is_zero() {
            equity_lines.push(StatementLine {
                account_id: None,
                code: String::new(),
                name: CURRENT_EARNINGS_LABEL.into(),
                amount: earnings,
            });
        }

        let assets = StatementSection::from_lines(ledger_currency, section_for(AccountNature::Asset))?;
        let liabilities =
            StatementSection::from_lines(ledger_currency, section_for(AccountNature::Liability))?;
        let equity = StatementSection::from_lines(ledger_currency, equity_lines)?;
        let is_balanced = assets.total == liabilities.total.add(&equity.total)?;

        if currency == ledger_currency {
            return Ok(Self {
                as_of,
                currency: currency.clone(),
                assets,
                liabilities,
                equity,
                is_balanced,
            });
        }
        Ok(Self {
            as_of,
            currency: currency.clone(),
            assets: assets.converted(currency, fx)?,
            liabilities: liabilities.converted(currency, fx)?,
            equity: equity.converted(currency, fx)?,
            is_balanced,
        })
    }

    pub fn net_assets(&self) -> LedgerResult<Money> {
        self.assets.total.subtract(&self.liabilities.total)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncomeStatement {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub currency: CurrencyCode,
    pub income: StatementSection,
    pub expenses: StatementSection,
    pub net_income: Money,
}

impl IncomeStatement {
    /// Builds the statement from per-account activity already expressed in
    /// `currency`; zero lines are dropped.
    pub fn from_activity(
        from: NaiveDate,
        to: NaiveDate,
        currency: &CurrencyCode,
        income: Vec<StatementLine>,
        expenses: Vec<StatementLine>,
    ) -> LedgerResult<Self> {
        let keep = |lines: Vec<StatementLine>| {
            let mut lines: Vec<_> = lines.into_iter().filter(|l| !l.amount.is_zero()).collect();
            lines.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.name.cmp(&b.name)));
            lines
        };
        let income = StatementSection::from_lines(currency, keep(income))?;
        let expenses = StatementSection::from_lines(currency, keep(expenses))?;
        let net_income = income.total.subtract(&expenses.total)?;
        Ok(Self {
            from,
            to,
            currency: currency.clone(),
            income,
            expenses,
            net_income,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Account;

    fn mxn(minor: i64) -> Money {
        Money::from_minor(minor, CurrencyCode::new("MXN"))
    }

    fn balance(name: &str, nature: AccountNature, minor: i64) -> AccountBalance {
        AccountBalance {
            account: Account::new("", name, nature),
            balance: mxn(minor),
        }
    }

    #[test]
    fn reversed_balances_move_to_opposite_column() {
        let balances = vec![
            balance("Checking", AccountNature::Asset, -5_000),
            balance("Credit Card", AccountNature::Liability, -5_000),
        ];
        let date = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let tb = TrialBalance::from_balances(date, &CurrencyCode::new("MXN"), &balances).unwrap();
        assert_eq!(tb.lines[0].credit.amount_minor(), 5_000);
        assert_eq!(tb.lines[1].debit.amount_minor(), 5_000);
        assert!(tb.is_balanced);
    }

    #[test]
    fn current_earnings_closes_the_equation() {
        let balances = vec![
            balance("Checking", AccountNature::Asset, 70_000),
            balance("Salary", AccountNature::Income, 100_000),
            balance("Rent", AccountNature::Expense, 30_000),
        ];
        let date = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let mxn_code = CurrencyCode::new("MXN");
        let fx = crate::currency::FxTable::new();
        let sheet =
            BalanceSheet::from_balances(date, &mxn_code, &balances, &mxn_code, &fx.at(date))
                .unwrap();
        assert!(sheet.is_balanced);
        assert_eq!(sheet.equity.lines[0].name, CURRENT_EARNINGS_LABEL);
        assert_eq!(sheet.equity.total.amount_minor(), 70_000);
    }

    #[test]
    fn income_statement_drops_zero_lines() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let line = |name: &str, minor| StatementLine {
            account_id: None,
            code: String::new(),
            name: name.into(),
            amount: mxn(minor),
        };
        let statement = IncomeStatement::from_activity(
            date,
            date,
            &CurrencyCode::new("MXN"),
            vec![line("Salary", 100_000), line("Bonus", 0)],
            vec![line("Rent", 40_000)],
        )
        .unwrap();
        assert_eq!(statement.income.lines.len(), 1);
        assert_eq!(statement.net_income.amount_minor(), 60_000);
    }
}
