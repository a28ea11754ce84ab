//! Keyword heuristics that bucket accounts for display. They never affect
//! balances, only which report section an amount lands in.

use crate::{
    config::Config,
    ledger::{Account, AccountNature},
};

/// Decides whether an account holds spendable money for cash-flow purposes.
pub trait CashAccountClassifier {
    fn is_cash_like(&self, account: &Account) -> bool;
}

/// Splits expense accounts into essential and discretionary spending.
pub trait ExpenseClassifier {
    fn is_essential(&self, account: &Account) -> bool;
}

impl<F> CashAccountClassifier for F
where
    F: Fn(&Account) -> bool,
{
    fn is_cash_like(&self, account: &Account) -> bool {
        self(account)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordClassifier {
    cash_keywords: Vec<String>,
    cash_code_prefix: String,
    essential_keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(
        cash_keywords: Vec<String>,
        cash_code_prefix: impl Into<String>,
        essential_keywords: Vec<String>,
    ) -> Self {
        let lower = |words: Vec<String>| {
            words
                .into_iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect()
        };
        Self {
            cash_keywords: lower(cash_keywords),
            cash_code_prefix: cash_code_prefix.into().trim().to_string(),
            essential_keywords: lower(essential_keywords),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.cash_keywords.clone(),
            config.cash_code_prefix.clone(),
            config.essential_keywords.clone(),
        )
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CashAccountClassifier for KeywordClassifier {
    fn is_cash_like(&self, account: &Account) -> bool {
        if !matches!(account.nature, AccountNature::Asset | AccountNature::Liability) {
            return false;
        }
        if !self.cash_code_prefix.is_empty() && account.code.starts_with(&self.cash_code_prefix) {
            return true;
        }
        contains_any(&account.name, &self.cash_keywords)
    }
}

impl ExpenseClassifier for KeywordClassifier {
    fn is_essential(&self, account: &Account) -> bool {
        account.nature == AccountNature::Expense
            && contains_any(&account.name, &self.essential_keywords)
    }
}

fn contains_any(name: &str, keywords: &[String]) -> bool {
    let name = name.to_lowercase();
    keywords.iter().any(|keyword| name.contains(keyword.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_matches_by_code_prefix_or_keyword() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.is_cash_like(&Account::new("1000", "Petty", AccountNature::Asset)));
        assert!(classifier.is_cash_like(&Account::new("", "BBVA Checking", AccountNature::Asset)));
        assert!(!classifier.is_cash_like(&Account::new("1500", "Investments", AccountNature::Asset)));
        assert!(!classifier.is_cash_like(&Account::new("1001", "Cash", AccountNature::Expense)));
    }

    #[test]
    fn essential_expenses_match_keywords() {
        let classifier = KeywordClassifier::default();
        assert!(classifier.is_essential(&Account::new("5000", "Rent", AccountNature::Expense)));
        assert!(!classifier.is_essential(&Account::new("5400", "Dining Out", AccountNature::Expense)));
    }
}
