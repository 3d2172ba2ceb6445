use anyhow::{anyhow, Context, Result};
use clap::Parser;
use libkopi::{source, ParseOptions};
use tracing_subscriber::EnvFilter;

use std::io::{self, Cursor, Read};
use std::path::PathBuf;

/// Parse and balance plain-text ledgers, printing the result in ledger format.
#[derive(Debug, Parser)]
#[command(name = "kopi", version)]
struct Cli {
    /// Ledger files, `include` directives are followed. Reads stdin when none given.
    #[arg(env = "KOPI_LEDGER_FILE")]
    files: Vec<PathBuf>,

    /// Print transactions as they are parsed, in file order, reporting every error
    /// instead of stopping at the first one.
    #[arg(long)]
    stream: bool,

    /// chrono format for header dates, may be repeated. Defaults to
    /// `%Y/%m/%d`, `%Y-%m-%d` and `%Y.%m.%d`.
    #[arg(long = "date-format", value_name = "FORMAT")]
    date_formats: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut options = ParseOptions::new();
    if !cli.date_formats.is_empty() {
        options = options.with_date_formats(cli.date_formats.iter().cloned());
    }

    let input = if cli.files.is_empty() {
        options = options.with_source_name("<stdin>");
        let mut input = Vec::new();
        io::stdin()
            .read_to_end(&mut input)
            .context("unable to read ledger from stdin")?;
        input
    } else {
        let mut input = String::new();
        for path in &cli.files {
            input.push_str(&source::read_ledger_file(path)?);
            input.push('\n');
        }
        input.into_bytes()
    };

    if cli.stream {
        let mut failures = 0usize;
        for item in libkopi::stream_with(Cursor::new(input), options) {
            match item {
                Ok(transaction) => println!("{}", transaction),
                Err(err) => {
                    tracing::error!("{}", err);
                    failures += 1;
                }
            }
        }
        if failures > 0 {
            return Err(anyhow!("{} error(s) while parsing ledger", failures));
        }
    } else {
        let ledger = libkopi::parse_with(Cursor::new(input), &options)?;
        tracing::info!(transactions = ledger.len(), "ledger parsed");
        for transaction in &ledger {
            println!("{}", transaction);
        }
    }

    Ok(())
}
