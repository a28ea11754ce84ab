use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    currency::{CurrencyCode, FxConverter, Money},
    errors::LedgerResult,
    ledger::{AccountNature, ExternalAccount, LedgerEngine},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSource {
    Ledger,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetWorthLine {
    pub account_id: Uuid,
    pub name: String,
    pub source: BalanceSource,
    pub nature: AccountNature,
    /// Converted balance; liabilities are positive magnitudes.
    pub balance: Money,
    pub included: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetWorth {
    pub as_of: NaiveDate,
    pub currency: CurrencyCode,
    pub assets: Money,
    pub liabilities: Money,
    pub net_worth: Money,
    pub lines: Vec<NetWorthLine>,
}

/// Ledger asset and liability balances plus manually tracked accounts, all
/// converted to `currency`. Ledger accounts that mirror an external account
/// are skipped so the external balance is only counted once.
pub fn build_net_worth(
    engine: &LedgerEngine,
    external: &[ExternalAccount],
    as_of: NaiveDate,
    currency: &CurrencyCode,
    fx: &dyn FxConverter,
) -> LedgerResult<NetWorth> {
    let mut lines = Vec::new();
    for entry in engine.get_all_account_balances(as_of)? {
        let nature = entry.account.nature;
        if !matches!(nature, AccountNature::Asset | AccountNature::Liability)
            || entry.account.external_id.is_some()
            || entry.balance.is_zero()
        {
            continue;
        }
        lines.push(NetWorthLine {
            account_id: entry.account.id,
            name: entry.account.name.clone(),
            source: BalanceSource::Ledger,
            nature,
            balance: fx.convert(&entry.balance, currency)?,
            included: true,
        });
    }
    for account in external {
        lines.push(NetWorthLine {
            account_id: account.id,
            name: account.name.clone(),
            source: BalanceSource::External,
            nature: account.nature(),
            balance: fx.convert(&account.normalized_balance()?, currency)?,
            included: !account.exclude_from_total,
        });
    }

    let total = |nature: AccountNature| {
        Money::sum(
            currency,
            lines
                .iter()
                .filter(|line| line.included && line.nature == nature)
                .map(|line| &line.balance),
        )
    };
    let assets = total(AccountNature::Asset)?;
    let liabilities = total(AccountNature::Liability)?;
    Ok(NetWorth {
        as_of,
        currency: currency.clone(),
        net_worth: assets.subtract(&liabilities)?,
        assets,
        liabilities,
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        currency::FxTable,
        ledger::{ExternalAccountKind, OwnerId, TransactionDraft},
        storage::MemoryStore,
    };

    fn money(minor: i64, code: &str) -> Money {
        Money::from_minor(minor, CurrencyCode::new(code))
    }

    #[test]
    fn combines_ledger_and_external_accounts() {
        let as_of = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let mut engine = LedgerEngine::open(
            OwnerId::new("ana"),
            CurrencyCode::new("MXN"),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        engine.seed_standard_chart().unwrap();
        let id = |code: &str| engine.find_account_by_code(code).unwrap().id;
        let (checking, opening, dining, card) = (id("1010"), id("3000"), id("5400"), id("2000"));
        engine
            .add_transaction(
                TransactionDraft::new(as_of, "Opening")
                    .debit(checking, money(1_000_000, "MXN"))
                    .credit(opening, money(1_000_000, "MXN")),
            )
            .unwrap();
        engine
            .add_transaction(
                TransactionDraft::new(as_of, "Dinner")
                    .debit(dining, money(100_000, "MXN"))
                    .credit(card, money(100_000, "MXN")),
            )
            .unwrap();

        let mut fx = FxTable::new();
        fx.ensure(&CurrencyCode::new("USD"), &CurrencyCode::new("MXN"), as_of, 20.0)
            .unwrap();
        let mut car = ExternalAccount::new("Car", ExternalAccountKind::Vehicle, money(500_000, "USD"));
        car.exclude_from_total = true;
        let external = vec![
            ExternalAccount::new("Brokerage", ExternalAccountKind::Investment, money(100_000, "USD")),
            ExternalAccount::new("Car loan", ExternalAccountKind::Loan, money(-2_000_000, "MXN")),
            car,
        ];

        let worth =
            build_net_worth(&engine, &external, as_of, &CurrencyCode::new("MXN"), &fx.at(as_of))
                .unwrap();
        assert_eq!(worth.assets, money(3_000_000, "MXN"));
        assert_eq!(worth.liabilities, money(2_100_000, "MXN"));
        assert_eq!(worth.net_worth, money(900_000, "MXN"));
        assert_eq!(worth.lines.iter().filter(|l| !l.included).count(), 1);
    }
}
