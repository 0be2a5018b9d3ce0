// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::Parser;
use std::io;

// Use library instead of local modules
use clv_ledger::{run_report, Cli, Command, LedgerConfig, UiArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = LedgerConfig::load(cli.config.as_deref())?;
    log::debug!("config: {:?}", config);

    match &cli.command {
        Command::Report(args) => {
            println!("📊 CLV Ledger v{}", clv_ledger::VERSION);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            let stdout = io::stdout();
            run_report(args, &config, &mut stdout.lock())?;
        }
        Command::Ui(args) => run_ui_mode(args, &config)?,
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(args: &UiArgs, config: &LedgerConfig) -> Result<()> {
    println!("🖥️  Loading CLV Ledger dashboard...\n");

    let mut store = clv_ledger::RecordStore::new();
    for path in &args.import {
        let count = store.import_csv_path(path)?;
        println!("✓ Loaded {} records from {}", count, path.display());
    }

    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(store, config.clone());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed ({} records in session)", app.store.len());

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_args: &UiArgs, _config: &LedgerConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web dashboard: cargo run --bin clv-server --features server");
    std::process::exit(1);
}
