use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accounting classification that decides which side increases an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AccountNature {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

impl AccountNature {
    pub const ALL: [AccountNature; 5] = [
        AccountNature::Asset,
        AccountNature::Liability,
        AccountNature::Equity,
        AccountNature::Income,
        AccountNature::Expense,
    ];

    /// Side on which the account's balance is normally carried.
    pub fn normal_side(self) -> EntrySide {
        match self {
            AccountNature::Asset | AccountNature::Expense => EntrySide::Debit,
            AccountNature::Liability | AccountNature::Equity | AccountNature::Income => {
                EntrySide::Credit
            }
        }
    }

    /// Balance-sheet natures are stocks; income and expense are flows.
    pub fn is_balance_sheet(self) -> bool {
        matches!(
            self,
            AccountNature::Asset | AccountNature::Liability | AccountNature::Equity
        )
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asset" => Some(AccountNature::Asset),
            "liability" => Some(AccountNature::Liability),
            "equity" => Some(AccountNature::Equity),
            "income" => Some(AccountNature::Income),
            "expense" => Some(AccountNature::Expense),
            _ => None,
        }
    }
}

impl fmt::Display for AccountNature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountNature::Asset => "Asset",
            AccountNature::Liability => "Liability",
            AccountNature::Equity => "Equity",
            AccountNature::Income => "Income",
            AccountNature::Expense => "Expense",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    pub fn opposite(self) -> Self {
        match self {
            EntrySide::Debit => EntrySide::Credit,
            EntrySide::Credit => EntrySide::Debit,
        }
    }
}

impl fmt::Display for EntrySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySide::Debit => f.write_str("Debit"),
            EntrySide::Credit => f.write_str("Credit"),
        }
    }
}

/// Ledger account in the chart of accounts.
///
/// `code` is a display identifier only; lookups always go through `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub nature: AccountNature,
    pub is_active: bool,
    /// Set when the account mirrors a manually tracked net-worth account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(code: impl Into<String>, name: impl Into<String>, nature: AccountNature) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            nature,
            is_active: true,
            external_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn display_label(&self) -> String {
        if self.code.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.code, self.name)
        }
    }
}

/// Input for creating a ledger account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountDraft {
    pub code: String,
    pub name: String,
    pub nature: AccountNature,
}

impl AccountDraft {
    pub fn new(code: impl Into<String>, name: impl Into<String>, nature: AccountNature) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            nature,
        }
    }
}

/// Partial update applied by `LedgerEngine::update_account`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nature: Option<AccountNature>,
}

/// Default chart of accounts seeded into a new ledger.
pub fn standard_chart() -> Vec<AccountDraft> {
    vec![
        AccountDraft::new("1000", "Cash", AccountNature::Asset),
        AccountDraft::new("1010", "Checking", AccountNature::Asset),
        AccountDraft::new("1020", "Savings", AccountNature::Asset),
        AccountDraft::new("1500", "Investments", AccountNature::Asset),
        AccountDraft::new("2000", "Credit Card", AccountNature::Liability),
        AccountDraft::new("2500", "Loans", AccountNature::Liability),
        AccountDraft::new("3000", "Opening Balances", AccountNature::Equity),
        AccountDraft::new("4000", "Salary", AccountNature::Income),
        AccountDraft::new("4100", "Other Income", AccountNature::Income),
        AccountDraft::new("5000", "Rent", AccountNature::Expense),
        AccountDraft::new("5100", "Groceries", AccountNature::Expense),
        AccountDraft::new("5200", "Utilities", AccountNature::Expense),
        AccountDraft::new("5300", "Transport", AccountNature::Expense),
        AccountDraft::new("5400", "Dining Out", AccountNature::Expense),
        AccountDraft::new("5500", "Entertainment", AccountNature::Expense),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_sides_follow_nature() {
        assert_eq!(AccountNature::Asset.normal_side(), EntrySide::Debit);
        assert_eq!(AccountNature::Expense.normal_side(), EntrySide::Debit);
        assert_eq!(AccountNature::Liability.normal_side(), EntrySide::Credit);
        assert_eq!(AccountNature::Equity.normal_side(), EntrySide::Credit);
        assert_eq!(AccountNature::Income.normal_side(), EntrySide::Credit);
    }

    #[test]
    fn nature_parses_case_insensitively() {
        assert_eq!(AccountNature::parse(" Liability "), Some(AccountNature::Liability));
        assert_eq!(AccountNature::parse("revenue"), None);
    }
}
