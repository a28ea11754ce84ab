//! Read-only derivations over the ledger engine and tracked accounts.
//!
//! Builders never substitute a default for a missing FX rate; the first
//! conversion error aborts the whole report.

pub mod breakdown;
pub mod cashflow;
pub mod classify;
pub mod monthend;
pub mod networth;
pub mod statements;

pub use breakdown::{
    build_expense_breakdown, build_savings_potential, ExpenseBreakdown, ExpenseShare,
    SavingsPotential,
};
pub use cashflow::{
    build_cash_flow, CashFlowCategory, CashFlowEntry, CashFlowStatement, FlowDirection,
};
pub use classify::{CashAccountClassifier, ExpenseClassifier, KeywordClassifier};
pub use monthend::{build_month_end_summary, MonthEndLine, MonthEndSummary, RecommendedAction};
pub use networth::{build_net_worth, BalanceSource, NetWorth, NetWorthLine};
pub use statements::{
    BalanceSheet, IncomeStatement, StatementLine, StatementSection, TrialBalance,
    TrialBalanceLine, CURRENT_EARNINGS_LABEL,
};
