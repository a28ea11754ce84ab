//! Strict, date-keyed exchange-rate table.
//!
//! A rate is either registered for the exact pair and date or the lookup fails
//! with [`LedgerError::FxMissing`]. There is no nearest-date fallback and no
//! inversion of the opposite pair.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{money::round_to_minor, CurrencyCode, Money};
use crate::errors::{LedgerError, LedgerResult};

/// A single registered conversion rate: `1 from = rate to`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FxRate {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub date: NaiveDate,
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FxTable {
    rates: HashMap<(CurrencyCode, CurrencyCode), BTreeMap<NaiveDate, FxRate>>,
}

impl FxTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rates(rates: impl IntoIterator<Item = FxRate>) -> LedgerResult<Self> {
        let mut table = Self::new();
        for rate in rates {
            table.insert(rate)?;
        }
        Ok(table)
    }

    /// Registers or overwrites the rate for `base → quote` on `as_of`.
    pub fn ensure(
        &mut self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        as_of: NaiveDate,
        rate: f64,
    ) -> LedgerResult<()> {
        self.insert(FxRate {
            from: base.clone(),
            to: quote.clone(),
            date: as_of,
            rate,
            source: None,
        })
    }

    pub fn insert(&mut self, rate: FxRate) -> LedgerResult<()> {
        if !rate.rate.is_finite() || rate.rate <= 0.0 {
            return Err(LedgerError::validation(format!(
                "FX rate {} → {} must be positive, got {}",
                rate.from, rate.to, rate.rate
            )));
        }
        if rate.from == rate.to {
            return Err(LedgerError::validation(format!(
                "cannot register a rate from {} to itself",
                rate.from
            )));
        }
        self.rates
            .entry((rate.from.clone(), rate.to.clone()))
            .or_default()
            .insert(rate.date, rate);
        Ok(())
    }

    pub fn get_rate(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        as_of: NaiveDate,
    ) -> LedgerResult<f64> {
        if base == quote {
            return Ok(1.0);
        }
        self.rates
            .get(&(base.clone(), quote.clone()))
            .and_then(|series| series.get(&as_of))
            .map(|rate| rate.rate)
            .ok_or_else(|| LedgerError::FxMissing {
                from: base.to_string(),
                to: quote.to_string(),
                date: as_of,
            })
    }

    /// Converts `amount` into `to` using the rate registered on `as_of`.
    pub fn convert(&self, amount: &Money, to: &CurrencyCode, as_of: NaiveDate) -> LedgerResult<Money> {
        let rate = self.get_rate(amount.currency(), to, as_of)?;
        apply_rate(amount, to, rate)
    }

    /// A converter pinned to one date, for report builders.
    pub fn at(&self, as_of: NaiveDate) -> FxView<'_> {
        FxView { table: self, as_of }
    }

    pub fn all_rates(&self) -> Vec<FxRate> {
        let mut out: Vec<FxRate> = self
            .rates
            .values()
            .flat_map(|series| series.values().cloned())
            .collect();
        out.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.from.cmp(&b.from))
                .then_with(|| a.to.cmp(&b.to))
        });
        out
    }

    pub fn is_empty(&self) -> bool {
        self.rates.values().all(BTreeMap::is_empty)
    }
}

/// Display-time conversion capability injected into report builders.
pub trait FxConverter {
    fn convert(&self, amount: &Money, to: &CurrencyCode) -> LedgerResult<Money>;
}

impl<F> FxConverter for F
where
    F: Fn(&Money, &CurrencyCode) -> LedgerResult<Money>,
{
    fn convert(&self, amount: &Money, to: &CurrencyCode) -> LedgerResult<Money> {
        self(amount, to)
    }
}

/// [`FxTable`] lookups fixed to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FxView<'a> {
    table: &'a FxTable,
    as_of: NaiveDate,
}

impl FxView<'_> {
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }
}

impl FxConverter for FxView<'_> {
    fn convert(&self, amount: &Money, to: &CurrencyCode) -> LedgerResult<Money> {
        self.table.convert(amount, to, self.as_of)
    }
}

fn apply_rate(amount: &Money, to: &CurrencyCode, rate: f64) -> LedgerResult<Money> {
    if amount.currency() == to {
        return Ok(amount.clone());
    }
    let shift = to.exponent() as i32 - amount.currency().exponent() as i32;
    let converted = amount.amount_minor() as f64 * rate * 10f64.powi(shift);
    Ok(Money::from_minor(round_to_minor(converted)?, to.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_currency_is_parity_without_lookup() {
        let table = FxTable::new();
        let mxn = CurrencyCode::new("MXN");
        assert_eq!(table.get_rate(&mxn, &mxn, date(1999, 1, 1)).unwrap(), 1.0);
    }

    #[test]
    fn missing_rate_fails_without_fallback() {
        let mut table = FxTable::new();
        let usd = CurrencyCode::new("USD");
        let mxn = CurrencyCode::new("MXN");
        table.ensure(&usd, &mxn, date(2025, 10, 1), 18.5).unwrap();

        let err = table
            .get_rate(&usd, &mxn, date(2025, 10, 2))
            .expect_err("no nearest-date fallback");
        assert!(matches!(err, LedgerError::FxMissing { .. }));
        assert!(table.get_rate(&mxn, &usd, date(2025, 10, 1)).is_err());
    }

    #[test]
    fn from_rates_loads_a_feed_and_rejects_bad_entries() {
        let usd = CurrencyCode::new("USD");
        let mxn = CurrencyCode::new("MXN");
        let rate = |day: u32, value: f64| FxRate {
            from: usd.clone(),
            to: mxn.clone(),
            date: date(2025, 10, day),
            rate: value,
            source: Some("banxico".into()),
        };
        let table = FxTable::from_rates(vec![rate(1, 18.5), rate(2, 18.7)]).unwrap();
        assert_eq!(table.get_rate(&usd, &mxn, date(2025, 10, 2)).unwrap(), 18.7);
        assert_eq!(table.all_rates().len(), 2);

        let err = FxTable::from_rates(vec![rate(1, 18.5), rate(3, 0.0)]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn ensure_overwrites_existing_rate() {
        let mut table = FxTable::new();
        let usd = CurrencyCode::new("USD");
        let mxn = CurrencyCode::new("MXN");
        table.ensure(&usd, &mxn, date(2025, 10, 1), 18.5).unwrap();
        table.ensure(&usd, &mxn, date(2025, 10, 1), 19.0).unwrap();
        assert_eq!(table.get_rate(&usd, &mxn, date(2025, 10, 1)).unwrap(), 19.0);
        assert_eq!(table.all_rates().len(), 1);
    }

    #[test]
    fn rejects_non_positive_rates() {
        let mut table = FxTable::new();
        let err = table
            .ensure(&CurrencyCode::new("USD"), &CurrencyCode::new("EUR"), date(2025, 1, 1), 0.0)
            .expect_err("zero rate");
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn converts_across_exponents() {
        let mut table = FxTable::new();
        let usd = CurrencyCode::new("USD");
        let jpy = CurrencyCode::new("JPY");
        table.ensure(&usd, &jpy, date(2025, 3, 1), 150.0).unwrap();
        let ten_dollars = Money::from_minor(1000, usd);
        let yen = table.at(date(2025, 3, 1)).convert(&ten_dollars, &jpy).unwrap();
        assert_eq!(yen, Money::from_minor(1500, jpy));
    }
}
