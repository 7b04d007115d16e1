//! # ledger-sheet CLI
//!
//! Usage:
//!   ledger-sheet shops.json -o shops-balance.pdf
//!   echo '{ "shops": ["Alpha"] }' | ledger-sheet -o out.pdf
//!   ledger-sheet --example > shops.json

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ledger_sheet::config::FontSource;
use ledger_sheet::layout::ColumnDirection;
use ledger_sheet::{render_balance_sheet, BalanceSheetRequest, RenderConfig, SheetError};

#[derive(Parser)]
#[command(name = "ledger-sheet")]
#[command(version)]
#[command(about = "Render a paginated shop balance sheet to PDF", long_about = None)]
struct Cli {
    /// Request JSON ({"shops": [...]}); reads stdin when omitted
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output PDF file
    #[arg(short, long, value_name = "FILE", default_value = "shops-balance.pdf")]
    output: PathBuf,

    /// Render configuration (JSON, camelCase keys)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// TrueType font to embed instead of Helvetica
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Logo image: file path, data URI or base64
    #[arg(long, value_name = "SRC")]
    logo: Option<String>,

    /// Lay out columns right to left
    #[arg(long)]
    rtl: bool,

    /// Print an example request and exit
    #[arg(long)]
    example: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    if cli.example {
        print!("{}", example_request_json());
        return ExitCode::SUCCESS;
    }

    match run(&cli) {
        Ok(written) => {
            eprintln!("✓ Written {} bytes to {}", written, cli.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<usize, SheetError> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::from_json_file(path)?,
        None => RenderConfig::default(),
    };
    if let Some(font) = &cli.font {
        config.font = FontSource::File(font.clone());
    }
    if let Some(logo) = &cli.logo {
        config.logo = Some(logo.clone());
    }
    if cli.rtl {
        config.direction = ColumnDirection::RightToLeft;
    }

    let input = match &cli.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let request = BalanceSheetRequest::from_json(&input)?;
    let document = render_balance_sheet(&request, &config)?;
    fs::write(&cli.output, &document.bytes)?;
    Ok(document.bytes.len())
}

fn example_request_json() -> &'static str {
    r#"{
  "shops": [
    "Al Noor Grocery",
    "Blue Harbor Bakery",
    "Cedar Hardware",
    "سوق الخضار",
    "Delta Mobile Repair"
  ],
  "balances": [120.5, 0, 87.25, 310, 42.1]
}
"#
}
