use anyhow::Result;
use std::env;
use std::path::Path;
use std::process::ExitCode;

use atm_simulator::presentation::EMPTY_HISTORY_TEXT;
use atm_simulator::{
    export_csv, logging, Action, Config, Ledger, ResetOutcome, SqliteStore, Teller, VERSION,
};

const EXIT_OK: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;

fn main() -> Result<ExitCode> {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = Config::from_env()?;

    match args.first().map(String::as_str) {
        None | Some("tui") => run_ui_mode(&config),
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(ExitCode::SUCCESS)
        }
        Some(command) => {
            logging::init();
            // The teller (and its SQLite connection) is dropped before exit
            let code = run_command(&config, command, &args[1..])?;
            Ok(ExitCode::from(code))
        }
    }
}

fn open_teller(config: &Config) -> Result<Teller<SqliteStore>> {
    let store = SqliteStore::open(&config.db_path)?;
    Ok(Teller::new(Ledger::open(store), config.status_ttl))
}

/// Runs one subcommand and returns the process exit code
fn run_command(config: &Config, command: &str, rest: &[String]) -> Result<u8> {
    let mut teller = open_teller(config)?;

    // A load warning is shown before whatever the command prints
    if let Some(status) = teller.last_status() {
        eprintln!("⚠️  {}", status.text);
    }

    let ok = match command {
        "deposit" | "withdraw" => {
            let action = if command == "deposit" {
                Action::Deposit
            } else {
                Action::Withdraw
            };
            let input = rest.first().map(String::as_str).unwrap_or("");
            let ok = teller.submit(action, input);
            print_status(&teller);
            ok
        }
        "balance" => {
            teller.query_balance();
            print_status(&teller);
            true
        }
        "history" => {
            let rows = teller.history_rows();
            if rows.is_empty() {
                println!("{}", EMPTY_HISTORY_TEXT);
            }
            for row in rows {
                println!("{}", row.to_line());
            }
            true
        }
        "reset" => {
            let confirmed = rest.iter().any(|a| a == "--yes" || a == "-y");
            match teller.reset(confirmed) {
                Ok(ResetOutcome::Reset) => {
                    print_status(&teller);
                    true
                }
                Ok(ResetOutcome::Cancelled) => {
                    println!("Reset cancelled. Pass --yes to confirm.");
                    true
                }
                Err(_) => {
                    print_status(&teller);
                    false
                }
            }
        }
        "export" => {
            let Some(path) = rest.first() else {
                eprintln!("❌ Missing output file: atm-simulator export <file.csv>");
                return Ok(EXIT_USAGE);
            };
            let count = export_csv(Path::new(path), teller.ledger().history())?;
            println!("✓ Exported {} transactions to {}", count, path);
            true
        }
        other => {
            eprintln!("❌ Unknown command: {}", other);
            print_usage();
            return Ok(EXIT_USAGE);
        }
    };

    Ok(if ok { EXIT_OK } else { EXIT_FAILED })
}

fn print_status(teller: &Teller<SqliteStore>) {
    if let Some(status) = teller.last_status() {
        if status.is_error() {
            eprintln!("❌ {}", status.text);
        } else {
            println!("✓ {}", status.text);
        }
    }
}

fn print_usage() {
    println!("🏧 ATM Simulator v{}", VERSION);
    println!();
    println!("Usage: atm-simulator [command]");
    println!();
    println!("  tui                 interactive terminal UI (default)");
    println!("  deposit <amount>    deposit an amount, e.g. 100 or 12,50");
    println!("  withdraw <amount>   withdraw an amount");
    println!("  balance             show the current balance");
    println!("  history             list transactions, newest first");
    println!("  reset --yes         zero the balance and clear the history");
    println!("  export <file.csv>   write the history as CSV");
    println!();
    println!("Environment: ATM_DB_PATH, ATM_STATUS_TTL_MS, ATM_LOG_FILE, RUST_LOG");
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<ExitCode> {
    if let Some(log_file) = &config.log_file {
        logging::init_to_file(log_file)?;
    }

    let teller = open_teller(config)?;
    let mut app = atm_simulator::ui::App::new(teller);
    atm_simulator::ui::run_ui(&mut app)?;

    println!(
        "✅ Session closed. Balance: {}",
        atm_simulator::format_currency(app.teller.ledger().balance())
    );

    Ok(ExitCode::SUCCESS)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<ExitCode> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the one-shot commands: atm-simulator help");
    Ok(ExitCode::FAILURE)
}
