mod common;

use common::{account, date, mxn, setup_test_env, usd};
use ledger_core::{
    currency::{CurrencyCode, FxTable},
    ledger::{AccountNature, ExternalAccount, ExternalAccountKind, OwnerId, TransactionDraft},
    networth::{NetWorthTracker, YearMonth},
    reports::{build_month_end_summary, RecommendedAction},
    LedgerError,
};

#[test]
fn snapshot_per_month_survives_reopen() {
    let env = setup_test_env();
    let owner = OwnerId::new("ana");
    let mut engine = env.seeded_engine("ana");
    engine
        .add_transaction(
            TransactionDraft::new(date(2025, 9, 30), "Opening balance")
                .debit(account(&engine, "1010"), mxn(2_000_000))
                .credit(account(&engine, "3000"), mxn(2_000_000)),
        )
        .unwrap();

    let mut tracker = NetWorthTracker::open(owner.clone(), Box::new(env.store.clone())).unwrap();
    tracker
        .add_account(ExternalAccount::new(
            "Brokerage",
            ExternalAccountKind::Investment,
            usd(100_000),
        ))
        .unwrap();
    tracker
        .add_account(ExternalAccount::new(
            "Car loan",
            ExternalAccountKind::Loan,
            mxn(-500_000),
        ))
        .unwrap();

    let mut fx = FxTable::new();
    let today = date(2025, 10, 18);
    fx.ensure(&CurrencyCode::new("USD"), &CurrencyCode::new("MXN"), today, 18.0)
        .unwrap();
    let october: YearMonth = "2025-10".parse().unwrap();

    let first = tracker
        .create_snapshot(october, today, &engine, &fx.at(today))
        .unwrap();
    let second = tracker
        .create_snapshot(october, today, &engine, &fx.at(today))
        .unwrap();
    assert_eq!(first.net_worth_base, second.net_worth_base);
    assert_eq!(second.net_worth_base, mxn(3_300_000));
    assert_eq!(
        second.totals_by_nature.get(&AccountNature::Liability),
        Some(&mxn(500_000))
    );

    let reopened = NetWorthTracker::open(owner, Box::new(env.store.clone())).unwrap();
    assert_eq!(reopened.list_snapshots().len(), 1);
    assert_eq!(reopened.list_snapshots()[0].month, october);
}

#[test]
fn missing_rate_aborts_the_snapshot() {
    let env = setup_test_env();
    let engine = env.seeded_engine("ana");
    let mut tracker =
        NetWorthTracker::open(OwnerId::new("ana"), Box::new(env.store.clone())).unwrap();
    tracker
        .add_account(ExternalAccount::new(
            "Brokerage",
            ExternalAccountKind::Investment,
            usd(100_000),
        ))
        .unwrap();
    let fx = FxTable::new();
    let today = date(2025, 10, 18);
    let err = tracker
        .create_snapshot("2025-10".parse().unwrap(), today, &engine, &fx.at(today))
        .unwrap_err();
    assert!(matches!(err, LedgerError::FxMissing { .. }));
    assert!(tracker.list_snapshots().is_empty());
}

#[test]
fn month_end_summary_recommends_paydown() {
    let mut card = ExternalAccount::new("Visa", ExternalAccountKind::CreditCard, mxn(-320_000));
    card.metadata.min_payment = Some(mxn(50_000));
    let accounts = vec![
        ExternalAccount::new("Checking", ExternalAccountKind::Checking, mxn(900_000)),
        card,
    ];
    let fx = FxTable::new();
    let summary =
        build_month_end_summary(&accounts, &CurrencyCode::new("MXN"), &fx.at(date(2025, 10, 31)))
            .unwrap();
    assert_eq!(summary.liabilities[0].action, RecommendedAction::Paydown);
    assert_eq!(summary.liabilities[0].min_payment, Some(mxn(50_000)));
    assert_eq!(summary.net_position, mxn(580_000));
}
