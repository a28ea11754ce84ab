#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use chrono::NaiveDate;
use ledger_core::{
    config::{Config, ConfigManager},
    currency::{CurrencyCode, Money},
    ledger::{LedgerEngine, OwnerId},
    storage::JsonStore,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;
use uuid::Uuid;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub struct TestEnv {
    pub base: PathBuf,
    pub store: JsonStore,
    pub config: ConfigManager,
}

/// Creates an isolated data root with a JSON store and config manager.
pub fn setup_test_env() -> TestEnv {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let store = JsonStore::new(Some(base.clone()), Some(3)).expect("create json store");
    let config = ConfigManager::with_base_dir(base.clone()).expect("create config manager");
    config
        .save(&Config {
            base_currency: CurrencyCode::new("MXN"),
            ..Config::default()
        })
        .expect("write test config");
    TestEnv {
        base,
        store,
        config,
    }
}

impl TestEnv {
    pub fn engine(&self, owner: &str) -> LedgerEngine {
        LedgerEngine::open(
            OwnerId::new(owner),
            CurrencyCode::new("MXN"),
            Box::new(self.store.clone()),
        )
        .expect("open engine")
    }

    /// Engine with the standard chart already seeded.
    pub fn seeded_engine(&self, owner: &str) -> LedgerEngine {
        let mut engine = self.engine(owner);
        engine.seed_standard_chart().expect("seed chart");
        engine
    }
}

pub fn account(engine: &LedgerEngine, code: &str) -> Uuid {
    engine
        .find_account_by_code(code)
        .unwrap_or_else(|| panic!("account {code} missing"))
        .id
}

pub fn mxn(minor: i64) -> Money {
    Money::from_minor(minor, CurrencyCode::new("MXN"))
}

pub fn usd(minor: i64) -> Money {
    Money::from_minor(minor, CurrencyCode::new("USD"))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
