//! Fixed-point monetary values stored as integer minor units.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::CurrencyCode;
use crate::errors::{LedgerError, LedgerResult};

/// Immutable amount of money in a single currency.
///
/// All arithmetic happens on the integer minor-unit amount; `f64` only appears at
/// the major-unit boundary and when applying a scalar or FX rate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "MoneyRecord", try_from = "MoneyRecord")]
pub struct Money {
    amount_minor: i64,
    currency: CurrencyCode,
}

/// Storage shape for [`Money`]: integer minor units plus the currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyRecord {
    pub amount_minor: i64,
    pub currency: String,
}

impl Money {
    pub fn from_minor(amount_minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Converts a major-unit amount, rounding half away from zero to the currency's exponent.
    pub fn from_major(amount: f64, currency: CurrencyCode) -> LedgerResult<Self> {
        let scale = 10f64.powi(currency.exponent() as i32);
        let amount_minor = round_to_minor(amount * scale)?;
        Ok(Self::from_minor(amount_minor, currency))
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self::from_minor(0, currency)
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    /// Display-only conversion to major units.
    pub fn to_major(&self) -> f64 {
        self.amount_minor as f64 / 10f64.powi(self.currency.exponent() as i32)
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn add(&self, other: &Money) -> LedgerResult<Money> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount_minor
            .checked_add(other.amount_minor)
            .ok_or_else(|| overflow(&self.currency))?;
        Ok(Self::from_minor(amount, self.currency.clone()))
    }

    pub fn subtract(&self, other: &Money) -> LedgerResult<Money> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount_minor
            .checked_sub(other.amount_minor)
            .ok_or_else(|| overflow(&self.currency))?;
        Ok(Self::from_minor(amount, self.currency.clone()))
    }

    pub fn multiply(&self, scalar: f64) -> LedgerResult<Money> {
        let amount = round_to_minor(self.amount_minor as f64 * scalar)?;
        Ok(Self::from_minor(amount, self.currency.clone()))
    }

    pub fn divide(&self, scalar: f64) -> LedgerResult<Money> {
        if scalar == 0.0 {
            return Err(LedgerError::validation("cannot divide money by zero"));
        }
        let amount = round_to_minor(self.amount_minor as f64 / scalar)?;
        Ok(Self::from_minor(amount, self.currency.clone()))
    }

    pub fn negate(&self) -> LedgerResult<Money> {
        let amount = self
            .amount_minor
            .checked_neg()
            .ok_or_else(|| overflow(&self.currency))?;
        Ok(Self::from_minor(amount, self.currency.clone()))
    }

    pub fn abs(&self) -> LedgerResult<Money> {
        let amount = self
            .amount_minor
            .checked_abs()
            .ok_or_else(|| overflow(&self.currency))?;
        Ok(Self::from_minor(amount, self.currency.clone()))
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    /// Sums a sequence of amounts that must all be in `currency`.
    pub fn sum<'a, I>(currency: &CurrencyCode, items: I) -> LedgerResult<Money>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        items
            .into_iter()
            .try_fold(Money::zero(currency.clone()), |acc, item| acc.add(item))
    }

    fn ensure_same_currency(&self, other: &Money) -> LedgerResult<()> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                left: self.currency.to_string(),
                right: other.currency.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = super::format_minor_units(
            &super::LocaleConfig::default(),
            self.amount_minor,
            self.currency.exponent(),
        );
        write!(f, "{} {}", body, self.currency)
    }
}

impl From<Money> for MoneyRecord {
    fn from(value: Money) -> Self {
        Self {
            amount_minor: value.amount_minor,
            currency: value.currency.0,
        }
    }
}

impl TryFrom<MoneyRecord> for Money {
    type Error = LedgerError;

    fn try_from(record: MoneyRecord) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&record.currency)?;
        Ok(Money::from_minor(record.amount_minor, currency))
    }
}

pub(crate) fn round_to_minor(value: f64) -> LedgerResult<i64> {
    if !value.is_finite() {
        return Err(LedgerError::validation("amount must be a finite number"));
    }
    let rounded = value.round();
    if rounded.abs() >= i64::MAX as f64 {
        return Err(LedgerError::validation("amount is out of range"));
    }
    Ok(rounded as i64)
}

fn overflow(currency: &CurrencyCode) -> LedgerError {
    LedgerError::validation(format!("{} amount overflow", currency))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mxn(minor: i64) -> Money {
        Money::from_minor(minor, CurrencyCode::new("MXN"))
    }

    #[test]
    fn from_major_rounds_to_currency_exponent() {
        let money = Money::from_major(250.006, CurrencyCode::new("MXN")).unwrap();
        assert_eq!(money.amount_minor(), 25001);
        let yen = Money::from_major(1200.4, CurrencyCode::new("JPY")).unwrap();
        assert_eq!(yen.amount_minor(), 1200);
        assert!(Money::from_major(f64::NAN, CurrencyCode::new("USD")).is_err());
    }

    #[test]
    fn add_rejects_mismatched_currency() {
        let usd = Money::from_minor(100, CurrencyCode::new("USD"));
        let err = mxn(100).add(&usd).expect_err("mismatch must fail");
        assert!(matches!(err, LedgerError::CurrencyMismatch { .. }));
    }

    #[test]
    fn arithmetic_preserves_currency() {
        let total = mxn(1050).add(&mxn(250)).unwrap().subtract(&mxn(300)).unwrap();
        assert_eq!(total, mxn(1000));
        assert_eq!(total.multiply(1.5).unwrap(), mxn(1500));
        assert_eq!(total.divide(3.0).unwrap(), mxn(333));
        assert!(total.divide(0.0).is_err());
        assert!(mxn(-5).is_negative());
        assert_eq!(mxn(-5).abs().unwrap(), mxn(5));
        assert!(mxn(0).is_zero());
    }

    #[test]
    fn sign_flips_report_overflow_instead_of_panicking() {
        let extreme = mxn(i64::MIN);
        assert!(matches!(extreme.abs(), Err(LedgerError::Validation(_))));
        assert!(matches!(extreme.negate(), Err(LedgerError::Validation(_))));
        assert_eq!(mxn(i64::MAX).negate().unwrap(), mxn(-i64::MAX));
    }

    #[test]
    fn serializes_as_minor_units_and_code() {
        let json = serde_json::to_string(&mxn(25000)).unwrap();
        assert_eq!(json, r#"{"amount_minor":25000,"currency":"MXN"}"#);
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mxn(25000));
        assert!(serde_json::from_str::<Money>(r#"{"amount_minor":1,"currency":"??"}"#).is_err());
    }

    #[test]
    fn display_uses_major_units() {
        assert_eq!(mxn(25000).to_string(), "250.00 MXN");
        assert!((mxn(25000).to_major() - 250.0).abs() < f64::EPSILON);
    }
}
