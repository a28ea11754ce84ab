mod common;

use common::{account, date, mxn, setup_test_env, usd};
use ledger_core::{
    currency::{CurrencyCode, FxTable, Money},
    ledger::{AccountNature, ExternalAccount, ExternalAccountKind, TransactionDraft, TransactionFilter},
    reports::{build_cash_flow, build_savings_potential, CashFlowCategory, KeywordClassifier},
    LedgerError, LedgerResult,
};

fn same_currency(amount: &Money, _to: &CurrencyCode) -> LedgerResult<Money> {
    Ok(amount.clone())
}

#[test]
fn credit_card_balance_is_zero_before_and_250_after() {
    let env = setup_test_env();
    let mut engine = env.seeded_engine("ana");
    let groceries = account(&engine, "5100");
    let card = account(&engine, "2000");

    engine
        .add_transaction(
            TransactionDraft::new(date(2025, 10, 14), "Supermarket")
                .debit(groceries, mxn(25_000))
                .credit(card, mxn(25_000)),
        )
        .expect("balanced transaction");

    assert_eq!(engine.get_account_balance(card, date(2025, 10, 31)).unwrap(), mxn(25_000));
    assert!(engine
        .get_account_balance(card, date(2025, 10, 13))
        .unwrap()
        .is_zero());
}

#[test]
fn rejected_transaction_never_reaches_the_store() {
    let env = setup_test_env();
    let mut engine = env.seeded_engine("ana");
    let err = engine
        .add_transaction(
            TransactionDraft::new(date(2025, 10, 1), "Off by one")
                .debit(account(&engine, "5000"), mxn(100))
                .credit(account(&engine, "1010"), mxn(99)),
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::UnbalancedTransaction { .. }));
    assert!(engine.get_transactions(&TransactionFilter::all()).is_empty());

    let reopened = env.engine("ana");
    assert!(reopened.get_transactions(&TransactionFilter::all()).is_empty());
}

#[test]
fn statements_hold_after_a_month_of_activity() {
    let env = setup_test_env();
    let mut engine = env.seeded_engine("ana");
    let mut fx = FxTable::new();
    fx.ensure(
        &CurrencyCode::new("USD"),
        &CurrencyCode::new("MXN"),
        date(2025, 10, 10),
        18.5,
    )
    .unwrap();

    let checking = account(&engine, "1010");
    let savings = account(&engine, "1020");
    let card = account(&engine, "2000");
    let opening = account(&engine, "3000");
    let salary = account(&engine, "4000");
    let rent = account(&engine, "5000");
    let dining = account(&engine, "5400");

    let drafts = vec![
        TransactionDraft::new(date(2025, 10, 1), "Opening balance")
            .debit(checking, mxn(1_000_000))
            .credit(opening, mxn(1_000_000)),
        TransactionDraft::new(date(2025, 10, 1), "Payroll")
            .debit(checking, mxn(4_000_000))
            .credit(salary, mxn(4_000_000)),
        TransactionDraft::new(date(2025, 10, 2), "Rent")
            .debit(rent, mxn(1_500_000))
            .credit(checking, mxn(1_500_000)),
        TransactionDraft::new(date(2025, 10, 5), "Savings transfer")
            .debit(savings, mxn(500_000))
            .credit(checking, mxn(500_000)),
        TransactionDraft::new(date(2025, 10, 20), "Card payment")
            .debit(card, mxn(40_000))
            .credit(checking, mxn(40_000)),
    ];
    for draft in drafts {
        engine.add_transaction(draft).expect("valid draft");
    }
    engine
        .add_transaction_with_fx(
            TransactionDraft::new(date(2025, 10, 10), "Dinner in Austin")
                .debit(dining, usd(4_000))
                .credit(card, usd(4_000)),
            &fx,
        )
        .expect("booked at 18.5");

    let as_of = date(2025, 10, 31);
    let trial = engine.get_trial_balance(as_of).unwrap();
    assert!(trial.is_balanced);

    let mxn_code = CurrencyCode::new("MXN");
    let sheet = engine
        .get_balance_sheet(as_of, &mxn_code, &same_currency)
        .unwrap();
    assert!(sheet.is_balanced);
    assert_eq!(sheet.assets.total, mxn(3_460_000));
    assert_eq!(sheet.liabilities.total, mxn(34_000));

    // Display conversion uses the injected converter on original amounts.
    let statement = engine
        .get_income_statement(date(2025, 10, 1), as_of, &mxn_code, &fx.at(date(2025, 10, 10)))
        .unwrap();
    assert_eq!(statement.expenses.total, mxn(1_574_000));
    assert_eq!(statement.net_income, mxn(2_426_000));

    let flows = build_cash_flow(
        &engine,
        date(2025, 10, 1),
        as_of,
        &mxn_code,
        &same_currency,
        &KeywordClassifier::default(),
    )
    .unwrap();
    assert!(flows
        .entries
        .iter()
        .any(|entry| entry.category == CashFlowCategory::Internal));
    assert_eq!(flows.outflows, mxn(1_540_000));

    let potential = build_savings_potential(
        &engine,
        date(2025, 10, 1),
        as_of,
        &mxn_code,
        &fx.at(date(2025, 10, 10)),
        &KeywordClassifier::default(),
        0.5,
    )
    .unwrap();
    assert_eq!(potential.non_essential, mxn(74_000));
    assert_eq!(potential.potential_savings, mxn(37_000));
}

#[test]
fn mirrored_account_nature_is_frozen_once_posted() {
    let env = setup_test_env();
    let mut engine = env.seeded_engine("ana");
    let mut wallet = ExternalAccount::new("Wallet", ExternalAccountKind::Cash, mxn(10_000));
    let mirror = engine.sync_external_account(&wallet).unwrap();
    engine
        .add_transaction(
            TransactionDraft::new(date(2025, 10, 3), "ATM withdrawal")
                .debit(mirror.id, mxn(10_000))
                .credit(account(&engine, "1010"), mxn(10_000)),
        )
        .unwrap();

    wallet.kind = ExternalAccountKind::CreditCard;
    assert!(matches!(
        engine.sync_external_account(&wallet),
        Err(LedgerError::Validation(_))
    ));

    let reopened = env.engine("ana");
    assert_eq!(
        reopened.get_account(mirror.id).unwrap().nature,
        AccountNature::Asset
    );
    assert_eq!(
        reopened
            .get_account_balance(mirror.id, date(2025, 10, 31))
            .unwrap(),
        mxn(10_000)
    );
}
