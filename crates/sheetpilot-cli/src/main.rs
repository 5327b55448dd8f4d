use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sheetpilot_actions::{
    AuditReport, DirectApi, DirectResult, DispatchRequest, Dispatcher, SheetpilotConfig,
};
use sheetpilot_model::{CellValue, PermissionMode, RowData, RowMap};
use sheetpilot_store::DocumentStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Apply table commands to workbook files under a per-document permission mode.
#[derive(Parser)]
#[command(name = "sheetpilot", version, about)]
struct Cli {
    /// JSON config file (lock timeout, preview and summary sizes).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override how long to wait for another edit of the same workbook.
    #[arg(long, global = true, value_name = "MS")]
    lock_timeout_ms: Option<u64>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract commands from assistant text and apply the ones the policy allows.
    Dispatch {
        /// Workbook to edit.
        file: PathBuf,
        /// Permission mode of the workbook: read, read_write or read_write_delete.
        #[arg(long)]
        policy: PermissionMode,
        /// Target sheet (defaults to the first sheet).
        #[arg(long)]
        sheet: Option<String>,
        /// Assistant text; read from stdin when omitted.
        #[arg(long)]
        text: Option<String>,
        /// Print the audit message instead of JSON outcomes.
        #[arg(long)]
        report: bool,
    },
    /// Set one cell. Rows are counted from 1.
    UpdateCell {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        #[arg(long)]
        row: usize,
        #[arg(long)]
        column: String,
        #[arg(long)]
        value: String,
    },
    /// Append a row from `COLUMN=VALUE` pairs.
    AddRow {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        /// Column value (repeatable), e.g. `--data Name=Widget`.
        #[arg(long = "data", value_name = "COLUMN=VALUE", value_parser = parse_pair)]
        data: Vec<(String, String)>,
    },
    /// Remove one row. Rows are counted from 1.
    DeleteRow {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
        #[arg(long)]
        row: usize,
    },
    /// Print the rows of a sheet as JSON.
    Show {
        file: PathBuf,
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Print sheet names, columns and sample rows as JSON.
    Summary { file: PathBuf },
}

fn parse_pair(input: &str) -> Result<(String, String), String> {
    let Some((column, value)) = input.split_once('=') else {
        return Err(format!("expected COLUMN=VALUE, got `{input}`"));
    };
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in `{input}`"));
    }
    Ok((column.to_string(), value.trim().to_string()))
}

/// 1-based row from the command line to the 0-based index the engine uses.
fn row_index(row: usize) -> Result<usize> {
    row.checked_sub(1)
        .context("rows are numbered from 1; row 0 does not exist")
}

#[derive(Serialize)]
struct SheetRows {
    columns: Vec<String>,
    rows: Vec<RowMap>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<SheetpilotConfig> {
    let mut config = match &cli.config {
        Some(path) => SheetpilotConfig::from_path(path)?,
        None => SheetpilotConfig::default(),
    };
    if let Some(ms) = cli.lock_timeout_ms {
        config.lock_timeout_ms = ms;
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    handle.write_all(b"\n")?;
    Ok(())
}

fn finish_direct(result: DirectResult) -> Result<()> {
    print_json(&result)?;
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;
    log::debug!("using {config:?}");
    let store = DocumentStore::new(config.lock_timeout());
    let dispatcher = Dispatcher::with_store(store.clone(), config);
    let direct = DirectApi::new(store);

    match cli.command {
        Command::Dispatch {
            file,
            policy,
            sheet,
            text,
            report,
        } => {
            let text = match text {
                Some(text) => text,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("read assistant text from stdin")?;
                    buf
                }
            };
            let request = DispatchRequest {
                text,
                document_path: file,
                sheet,
                policy,
            };
            let outcomes = dispatcher.dispatch(&request);
            if report {
                println!("{}", AuditReport::from_outcomes(&outcomes).render());
                Ok(())
            } else {
                print_json(&outcomes)
            }
        }
        Command::UpdateCell {
            file,
            sheet,
            row,
            column,
            value,
        } => finish_direct(direct.update_cell(
            &file,
            sheet.as_deref(),
            row_index(row)?,
            &column,
            CellValue::Text(value),
        )),
        Command::AddRow { file, sheet, data } => {
            anyhow::ensure!(!data.is_empty(), "add-row needs at least one --data COLUMN=VALUE");
            let data: RowData = data
                .into_iter()
                .map(|(column, value)| (column, CellValue::Text(value)))
                .collect();
            finish_direct(direct.add_row(&file, sheet.as_deref(), data))
        }
        Command::DeleteRow { file, sheet, row } => {
            finish_direct(direct.delete_row(&file, sheet.as_deref(), row_index(row)?))
        }
        Command::Show { file, sheet } => {
            let table = dispatcher
                .read_rows(&file, sheet.as_deref(), PermissionMode::Read)
                .with_context(|| format!("read {}", file.display()))?;
            print_json(&SheetRows {
                columns: table.columns().to_vec(),
                rows: table.records(None),
            })
        }
        Command::Summary { file } => {
            let summary = dispatcher
                .summary(&file, PermissionMode::Read)
                .with_context(|| format!("summarize {}", file.display()))?;
            print_json(&summary)
        }
    }
}
