//! Currency codes, minor-unit precision, and locale-aware display formatting.

pub mod fx;
pub mod money;

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, LedgerResult};

pub use fx::{FxConverter, FxRate, FxTable, FxView};
pub use money::{Money, MoneyRecord};

/// ISO 4217 currency representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode(pub String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// Parses user input, rejecting anything that is not a 3-letter alphabetic code.
    pub fn parse(raw: &str) -> LedgerResult<Self> {
        let code = Self::new(raw);
        if code.0.len() != 3 || !code.0.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(LedgerError::validation(format!(
                "`{}` is not a currency code",
                raw
            )));
        }
        Ok(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places in the currency's minor unit.
    pub fn exponent(&self) -> u8 {
        minor_units_for(self.as_str())
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::new("USD")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Locale-aware formatting preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocaleConfig {
    pub language_tag: String,
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub date_format: DateFormatStyle,
    pub first_weekday: Weekday,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_tag: "en-US".into(),
            decimal_separator: '.',
            grouping_separator: ',',
            date_format: DateFormatStyle::Medium,
            first_weekday: Weekday::Mon,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatOptions {
    pub currency_display: CurrencyDisplay,
    pub negative_style: NegativeStyle,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            currency_display: CurrencyDisplay::Symbol,
            negative_style: NegativeStyle::Sign,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NegativeStyle {
    Sign,
    Parentheses,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CurrencyDisplay {
    Symbol,
    Code,
    SymbolAndCode,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateFormatStyle {
    Short,
    Medium,
    Long,
}

pub fn symbol_for(code: &str) -> String {
    match code {
        "USD" | "MXN" => "$".into(),
        "EUR" => "€".into(),
        "GBP" => "£".into(),
        "JPY" => "¥".into(),
        "AUD" => "A$".into(),
        _ => code.into(),
    }
}

pub fn minor_units_for(code: &str) -> u8 {
    match code {
        "JPY" | "KRW" | "CLP" => 0,
        "KWD" | "BHD" | "OMR" | "JOD" | "TND" => 3,
        "BTC" => 8,
        _ => 2,
    }
}

/// Renders the digits of a minor-unit amount with the locale's separators.
///
/// Works on the integer directly so large balances never pass through `f64`.
pub fn format_minor_units(locale: &LocaleConfig, amount_minor: i64, exponent: u8) -> String {
    let digits = amount_minor.unsigned_abs().to_string();
    let exponent = exponent as usize;
    let (int_part, frac_part) = if exponent == 0 {
        (digits, String::new())
    } else if digits.len() > exponent {
        let split = digits.len() - exponent;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = exponent))
    };
    let mut body = group_digits(&int_part, locale.grouping_separator);
    if !frac_part.is_empty() {
        body.push(locale.decimal_separator);
        body.push_str(&frac_part);
    }
    if amount_minor < 0 {
        format!("-{}", body)
    } else {
        body
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let mut grouped = String::new();
    for (count, ch) in digits.chars().rev().enumerate() {
        if count != 0 && count % 3 == 0 {
            grouped.insert(0, separator);
        }
        grouped.insert(0, ch);
    }
    grouped
}

pub fn format_money(money: &Money, locale: &LocaleConfig, options: &FormatOptions) -> String {
    let code = money.currency();
    let negative = money.is_negative();
    let body = format_minor_units(locale, money.amount_minor().abs(), code.exponent());
    let body = match (negative, options.negative_style) {
        (false, _) => body,
        (true, NegativeStyle::Sign) => format!("-{}", body),
        (true, NegativeStyle::Parentheses) => format!("({})", body),
    };
    let symbol = symbol_for(code.as_str());
    let rendered_body = if body.starts_with('(') {
        format!(" {}", body)
    } else {
        body.clone()
    };
    match options.currency_display {
        CurrencyDisplay::Symbol => format!("{}{}", symbol, rendered_body),
        CurrencyDisplay::Code => format!("{} {}", code.as_str(), body),
        CurrencyDisplay::SymbolAndCode => {
            format!("{}{} ({})", symbol, rendered_body, code.as_str())
        }
    }
}

pub fn format_date(locale: &LocaleConfig, date: NaiveDate) -> String {
    match locale.date_format {
        DateFormatStyle::Short => date.format("%Y-%m-%d").to_string(),
        DateFormatStyle::Medium => format!(
            "{:02} {} {}",
            date.day(),
            month_label(date.month()),
            date.year()
        ),
        DateFormatStyle::Long => format!(
            "{} {:02} {}, {}",
            date.weekday(),
            date.day(),
            month_label(date.month()),
            date.year()
        ),
    }
}

fn month_label(month: u32) -> &'static str {
    match month {
        1 => "Jan",
        2 => "Feb",
        3 => "Mar",
        4 => "Apr",
        5 => "May",
        6 => "Jun",
        7 => "Jul",
        8 => "Aug",
        9 => "Sep",
        10 => "Oct",
        11 => "Nov",
        12 => "Dec",
        _ => "",
    }
}
