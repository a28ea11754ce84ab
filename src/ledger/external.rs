//! Manually maintained net-worth accounts that are not backed by postings.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountNature;
use crate::{
    currency::{CurrencyCode, Money},
    errors::LedgerResult,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExternalAccountKind {
    Checking,
    Savings,
    Cash,
    Investment,
    Property,
    Vehicle,
    CreditCard,
    Loan,
    Mortgage,
    OtherAsset,
    OtherLiability,
}

impl ExternalAccountKind {
    pub fn nature(self) -> AccountNature {
        match self {
            ExternalAccountKind::CreditCard
            | ExternalAccountKind::Loan
            | ExternalAccountKind::Mortgage
            | ExternalAccountKind::OtherLiability => AccountNature::Liability,
            _ => AccountNature::Asset,
        }
    }

    pub fn is_liability(self) -> bool {
        self.nature() == AccountNature::Liability
    }
}

impl fmt::Display for ExternalAccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExternalAccountKind::Checking => "Checking",
            ExternalAccountKind::Savings => "Savings",
            ExternalAccountKind::Cash => "Cash",
            ExternalAccountKind::Investment => "Investment",
            ExternalAccountKind::Property => "Property",
            ExternalAccountKind::Vehicle => "Vehicle",
            ExternalAccountKind::CreditCard => "Credit Card",
            ExternalAccountKind::Loan => "Loan",
            ExternalAccountKind::Mortgage => "Mortgage",
            ExternalAccountKind::OtherAsset => "Other Asset",
            ExternalAccountKind::OtherLiability => "Other Liability",
        };
        f.write_str(label)
    }
}

/// Static per-account details shown next to the balance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalAccountMetadata {
    /// Annual yield or interest rate, as a percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yield_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_payment: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalAccount {
    pub id: Uuid,
    pub name: String,
    pub kind: ExternalAccountKind,
    pub currency: CurrencyCode,
    /// Liabilities may be entered as either sign; reports use the magnitude.
    pub balance: Money,
    #[serde(default)]
    pub exclude_from_total: bool,
    #[serde(default)]
    pub metadata: ExternalAccountMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExternalAccount {
    pub fn new(name: impl Into<String>, kind: ExternalAccountKind, balance: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            currency: balance.currency().clone(),
            balance,
            exclude_from_total: false,
            metadata: ExternalAccountMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn nature(&self) -> AccountNature {
        self.kind.nature()
    }

    /// Balance as a non-negative amount for liabilities, signed for assets.
    pub fn normalized_balance(&self) -> LedgerResult<Money> {
        if self.kind.is_liability() {
            self.balance.abs()
        } else {
            Ok(self.balance.clone())
        }
    }
}
