use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ledger_core::{
    currency::{CurrencyCode, Money},
    ledger::{LedgerEngine, OwnerId, TransactionDraft},
    storage::{
        json_backend::{load_document_from_path, save_document_to_path},
        LedgerDocument, MemoryStore,
    },
};
use tempfile::tempdir;

fn build_sample_engine(txn_count: usize) -> LedgerEngine {
    let mut engine = LedgerEngine::open(
        OwnerId::new("bench"),
        CurrencyCode::new("MXN"),
        Box::new(MemoryStore::new()),
    )
    .expect("open engine");
    engine.seed_standard_chart().expect("seed chart");
    let id = |code: &str| engine.find_account_by_code(code).expect("account").id;
    let (checking, card, groceries, salary) = (id("1010"), id("2000"), id("5100"), id("4000"));

    let start = NaiveDate::from_ymd_opt(2025, 1, 1).expect("date");
    for idx in 0..txn_count {
        let date = start + Duration::days((idx % 365) as i64);
        let amount = Money::from_minor(5_000 + (idx % 100) as i64 * 100, CurrencyCode::new("MXN"));
        let draft = if idx % 10 == 0 {
            TransactionDraft::new(date, "Payroll")
                .debit(checking, amount.clone())
                .credit(salary, amount)
        } else {
            TransactionDraft::new(date, "Groceries")
                .debit(groceries, amount.clone())
                .credit(if idx % 2 == 0 { card } else { checking }, amount)
        };
        engine.add_transaction(draft).expect("add transaction");
    }
    engine
}

fn bench_balances(c: &mut Criterion) {
    let engine = build_sample_engine(black_box(10_000));
    let as_of = NaiveDate::from_ymd_opt(2025, 12, 31).expect("date");
    let card = engine.find_account_by_code("2000").expect("card").id;

    c.bench_function("account_balance_10k", |b| {
        b.iter(|| black_box(engine.get_account_balance(card, as_of).expect("balance")))
    });

    c.bench_function("trial_balance_10k", |b| {
        b.iter(|| black_box(engine.get_trial_balance(as_of).expect("trial balance")))
    });
}

fn bench_document_io(c: &mut Criterion) {
    let engine = build_sample_engine(10_000);
    let mut document = LedgerDocument::new(engine.owner().clone());
    document.accounts = engine.get_accounts().into_iter().cloned().collect();
    document.transactions = engine.transactions().to_vec();
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bench.json");

    c.bench_function("document_save_10k", |b| {
        b.iter(|| save_document_to_path(&document, &path).expect("save document"))
    });

    save_document_to_path(&document, &path).expect("seed");
    c.bench_function("document_load_10k", |b| {
        b.iter(|| black_box(load_document_from_path(&path).expect("load document")))
    });
}

criterion_group!(benches, bench_balances, bench_document_io);
criterion_main!(benches);
