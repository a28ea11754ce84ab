use std::{env, path::PathBuf, process::ExitCode};

use chrono::{Datelike, Local, NaiveDate};
use colored::Colorize;

use ledger_core::{
    config::{Config, ConfigManager},
    currency::{format_date, format_money, FormatOptions, FxTable, Money},
    ledger::{LedgerEngine, OwnerId, TransactionFilter},
    networth::NetWorthTracker,
    reports::{build_net_worth, StatementSection},
    storage::JsonStore,
    utils::build_info,
    LedgerError, LedgerResult,
};

const USAGE: &str = "usage: ledger_core_cli <command> --owner <id> [--as-of YYYY-MM-DD] \
[--from YYYY-MM-DD --to YYYY-MM-DD] [--data-dir PATH]

commands:
  accounts          chart of accounts with balances
  transactions      transaction feed, newest first
  trial-balance     debit and credit columns per account
  balance-sheet     assets, liabilities and equity
  income-statement  income and expenses for a period
  net-worth         ledger plus tracked accounts
  snapshots         stored monthly net-worth snapshots
  version           build information";

struct Args {
    command: String,
    owner: Option<OwnerId>,
    as_of: Option<NaiveDate>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    data_dir: Option<PathBuf>,
}

fn parse_args(raw: Vec<String>) -> Result<Args, String> {
    let mut iter = raw.into_iter();
    let command = iter.next().ok_or_else(|| "missing command".to_string())?;
    let mut args = Args {
        command,
        owner: None,
        as_of: None,
        from: None,
        to: None,
        data_dir: None,
    };
    while let Some(flag) = iter.next() {
        let value = iter
            .next()
            .ok_or_else(|| format!("flag `{}` needs a value", flag))?;
        match flag.as_str() {
            "--owner" => args.owner = Some(OwnerId::new(value)),
            "--as-of" => args.as_of = Some(parse_date(&value)?),
            "--from" => args.from = Some(parse_date(&value)?),
            "--to" => args.to = Some(parse_date(&value)?),
            "--data-dir" => args.data_dir = Some(PathBuf::from(value)),
            other => return Err(format!("unknown flag `{}`", other)),
        }
    }
    Ok(args)
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("`{}` is not a YYYY-MM-DD date", raw))
}

struct Session {
    config: Config,
    store: JsonStore,
    owner: OwnerId,
    today: NaiveDate,
}

impl Session {
    fn open(args: &Args) -> LedgerResult<Self> {
        let owner = args
            .owner
            .clone()
            .ok_or_else(|| LedgerError::validation("--owner is required"))?;
        let manager = match &args.data_dir {
            Some(dir) => ConfigManager::with_base_dir(dir.clone())?,
            None => ConfigManager::new()?,
        };
        let config = manager.load()?;
        let root = args.data_dir.clone().or_else(|| config.data_root.clone());
        let store = JsonStore::new(root, Some(config.backup_retention))?;
        Ok(Self {
            config,
            store,
            owner,
            today: Local::now().date_naive(),
        })
    }

    fn engine(&self) -> LedgerResult<LedgerEngine> {
        LedgerEngine::open(
            self.owner.clone(),
            self.config.base_currency.clone(),
            Box::new(self.store.clone()),
        )
    }

    fn money(&self, money: &Money) -> String {
        format_money(money, &self.config.locale, &FormatOptions::default())
    }

    fn date(&self, date: NaiveDate) -> String {
        format_date(&self.config.locale, date)
    }
}

fn header(title: &str) {
    println!("{}", format!("=== {} ===", title).bold());
}

fn amount_cell(session: &Session, money: &Money) -> String {
    let text = format!("{:>18}", session.money(money));
    if money.is_negative() {
        text.red().to_string()
    } else {
        text
    }
}

fn print_section(session: &Session, title: &str, section: &StatementSection) {
    println!("{}", title.bold());
    for line in &section.lines {
        println!("  {:<32} {}", line.name, amount_cell(session, &line.amount));
    }
    println!("  {:<32} {}", "Total".bold(), amount_cell(session, &section.total));
}

fn run(args: Args) -> LedgerResult<()> {
    if args.command == "version" {
        println!("{}", build_info::current().summary());
        return Ok(());
    }
    let session = Session::open(&args)?;
    let as_of = args.as_of.unwrap_or(session.today);
    let fx = FxTable::new();

    match args.command.as_str() {
        "accounts" => {
            let engine = session.engine()?;
            header(&format!("Accounts as of {}", session.date(as_of)));
            for entry in engine.get_all_account_balances(as_of)? {
                let label = entry.account.display_label();
                let label = if entry.account.is_active {
                    label
                } else {
                    format!("{} (inactive)", label).dimmed().to_string()
                };
                println!(
                    "{:<36} {:<10} {}",
                    label,
                    entry.account.nature.to_string(),
                    amount_cell(&session, &entry.balance)
                );
            }
        }
        "transactions" => {
            let engine = session.engine()?;
            let filter = TransactionFilter {
                from: args.from,
                to: args.to,
                ..TransactionFilter::default()
            };
            header("Transactions");
            for txn in engine.get_transactions(&filter) {
                let total = txn.total_debits()?;
                println!(
                    "{}  {:<36} {}",
                    session.date(txn.date),
                    txn.description,
                    amount_cell(&session, &total)
                );
            }
        }
        "trial-balance" => {
            let engine = session.engine()?;
            let trial = engine.get_trial_balance(as_of)?;
            header(&format!("Trial balance as of {}", session.date(as_of)));
            println!("{:<36} {:>18} {:>18}", "Account", "Debit", "Credit");
            for line in trial.lines.iter().filter(|l| !l.debit.is_zero() || !l.credit.is_zero()) {
                println!(
                    "{:<36} {} {}",
                    format!("{} {}", line.code, line.name),
                    amount_cell(&session, &line.debit),
                    amount_cell(&session, &line.credit)
                );
            }
            println!(
                "{:<36} {} {}",
                "Totals".bold(),
                amount_cell(&session, &trial.total_debits),
                amount_cell(&session, &trial.total_credits)
            );
            if trial.is_balanced {
                println!("{}", "✔ balanced".green());
            } else {
                println!("{}", "✖ out of balance".red());
            }
        }
        "balance-sheet" => {
            let engine = session.engine()?;
            let sheet = engine.get_balance_sheet(as_of, engine.base_currency(), &fx.at(as_of))?;
            header(&format!("Balance sheet as of {}", session.date(as_of)));
            print_section(&session, "Assets", &sheet.assets);
            print_section(&session, "Liabilities", &sheet.liabilities);
            print_section(&session, "Equity", &sheet.equity);
            if !sheet.is_balanced {
                println!("{}", "⚠ assets differ from liabilities plus equity".yellow());
            }
        }
        "income-statement" => {
            let engine = session.engine()?;
            let to = args.to.unwrap_or(as_of);
            let from = args
                .from
                .unwrap_or_else(|| NaiveDate::from_ymd_opt(to.year(), to.month(), 1).unwrap_or(to));
            let statement =
                engine.get_income_statement(from, to, engine.base_currency(), &fx.at(to))?;
            header(&format!(
                "Income statement {} to {}",
                session.date(from),
                session.date(to)
            ));
            print_section(&session, "Income", &statement.income);
            print_section(&session, "Expenses", &statement.expenses);
            println!(
                "{:<34} {}",
                "Net income".bold(),
                amount_cell(&session, &statement.net_income)
            );
        }
        "net-worth" => {
            let engine = session.engine()?;
            let tracker =
                NetWorthTracker::open(session.owner.clone(), Box::new(session.store.clone()))?;
            let worth = build_net_worth(
                &engine,
                tracker.accounts(),
                as_of,
                engine.base_currency(),
                &fx.at(as_of),
            )?;
            header(&format!("Net worth as of {}", session.date(as_of)));
            for line in &worth.lines {
                let name = if line.included {
                    line.name.clone()
                } else {
                    format!("{} (excluded)", line.name).dimmed().to_string()
                };
                println!(
                    "{:<32} {:<10} {}",
                    name,
                    line.nature.to_string(),
                    amount_cell(&session, &line.balance)
                );
            }
            println!("{:<43} {}", "Assets", amount_cell(&session, &worth.assets));
            println!("{:<43} {}", "Liabilities", amount_cell(&session, &worth.liabilities));
            println!(
                "{:<43} {}",
                "Net worth".bold(),
                amount_cell(&session, &worth.net_worth)
            );
        }
        "snapshots" => {
            let tracker =
                NetWorthTracker::open(session.owner.clone(), Box::new(session.store.clone()))?;
            header("Net-worth snapshots");
            if tracker.list_snapshots().is_empty() {
                println!("No snapshots recorded.");
            }
            for snapshot in tracker.list_snapshots() {
                println!(
                    "{}  {}",
                    snapshot.month,
                    amount_cell(&session, &snapshot.net_worth_base)
                );
            }
        }
        other => {
            return Err(LedgerError::validation(format!(
                "unknown command `{}`",
                other
            )))
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    ledger_core::init();
    let args = match parse_args(env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{} {}\n\n{}", "error:".red().bold(), message, USAGE);
            return ExitCode::from(2);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
