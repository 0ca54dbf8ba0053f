//! sheetflow CLI - spreadsheet import and export tool
//!
//! Generates sample workbooks, imports them into a JSON-backed widget table
//! and exports the table back to XLSX.

use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sheetflow::persist::{Backend, MemoryTable};
use sheetflow::{CellEvent, Package, ParseType, PersistenceType, PipelineOptions, RowCallback};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Streaming spreadsheet import and export
#[derive(Parser)]
#[command(
    name = "sheetflow",
    author = "iyulab",
    version,
    about = "Import and export widget spreadsheets",
    long_about = "sheetflow - Streaming XLSX ingestion and export.\n\n\
                  Reads workbooks row by row into batched persistence and writes\n\
                  tables back out with a bounded memory window."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a workbook of sample rows with blank identifiers
    #[command(visible_alias = "gen")]
    Generate {
        /// Output file path
        output: PathBuf,

        /// Number of rows
        #[arg(short, long, default_value = "1000")]
        rows: usize,

        /// Rows kept in memory while writing
        #[arg(long, default_value = "100")]
        window: usize,
    },

    /// Import a workbook into the store
    Import {
        /// Input file path
        input: PathBuf,

        /// Store file
        #[arg(short, long, default_value = "widgets.json")]
        store: PathBuf,

        /// JSON options file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Records per batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Parsing mode
        #[arg(short, long)]
        parse: Option<ParseMode>,

        /// Persistence mode
        #[arg(long)]
        persistence: Option<PersistenceMode>,

        /// Read every sheet instead of only the first
        #[arg(long)]
        all_sheets: bool,
    },

    /// Export the store to a workbook
    Export {
        /// Output file path
        output: PathBuf,

        /// Store file
        #[arg(short, long, default_value = "widgets.json")]
        store: PathBuf,

        /// Rows kept in memory while writing
        #[arg(long, default_value = "100")]
        window: usize,
    },

    /// Remove every row from the store
    Truncate {
        /// Store file
        #[arg(short, long, default_value = "widgets.json")]
        store: PathBuf,
    },

    /// Show workbook information
    Info {
        /// Input file path
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Parsing mode
#[derive(Clone, ValueEnum)]
enum ParseMode {
    /// Event-driven streaming
    Sax,
    /// Load each sheet as a document
    Dom,
}

impl From<ParseMode> for ParseType {
    fn from(mode: ParseMode) -> Self {
        match mode {
            ParseMode::Sax => ParseType::EventDriven,
            ParseMode::Dom => ParseType::WholeDocument,
        }
    }
}

/// Persistence mode
#[derive(Clone, ValueEnum)]
enum PersistenceMode {
    /// Bulk insert and update statements per batch
    Jdbc,
    /// Per-record session saves, flushed and cleared per batch
    Jpa,
}

impl From<PersistenceMode> for PersistenceType {
    fn from(mode: PersistenceMode) -> Self {
        match mode {
            PersistenceMode::Jdbc => PersistenceType::BulkStatement,
            PersistenceMode::Jpa => PersistenceType::Session,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Generate {
            output,
            rows,
            window,
        } => {
            let pb = create_spinner("Writing rows...");
            let sink = BufWriter::new(File::create(&output)?);
            let summary = sheetflow::write_sample_rows(sink, rows, window)?;
            pb.finish_and_clear();

            println!(
                "{} Wrote {} rows to {}",
                "✓".green().bold(),
                summary.rows,
                output.display()
            );
        }

        Commands::Import {
            input,
            store,
            config,
            batch_size,
            parse,
            persistence,
            all_sheets,
        } => {
            let mut options = match config {
                Some(path) => PipelineOptions::from_json(&fs::read_to_string(path)?)?,
                None => PipelineOptions::default(),
            };
            if let Some(size) = batch_size {
                options = options.with_batch_size(size);
            }
            if let Some(mode) = parse {
                options = options.with_parse_type(mode.into());
            }
            if let Some(mode) = persistence {
                options = options.with_persistence_type(mode.into());
            }
            if all_sheets {
                options = options.with_all_sheets();
            }

            let pb = create_spinner("Importing rows...");
            let mut table = MemoryTable::load_from(&store)?;
            let summary = table.transaction(|t| {
                sheetflow::import_file(
                    &input,
                    &options,
                    Backend::select(options.persistence_type, t),
                )
            });
            pb.finish_and_clear();
            let summary = summary?;
            table.save_to(&store)?;

            println!(
                "{} Imported {} records from {} in {:.2?}",
                "✓".green().bold(),
                summary.batches.accepted,
                input.display(),
                summary.elapsed
            );
            println!(
                "  {} batch(es) of up to {} via {} / {}, {} committed",
                summary.batches.flushes,
                options.batch_size,
                options.parse_type,
                options.persistence_type,
                summary.batches.committed
            );
        }

        Commands::Export {
            output,
            store,
            window,
        } => {
            let table = load_existing(&store)?;

            let pb = create_spinner("Exporting rows...");
            let records = table.records();
            let sink = BufWriter::new(File::create(&output)?);
            let summary = sheetflow::export_records(&records, sink, window)?;
            pb.finish_and_clear();

            println!(
                "{} Exported {} records to {}",
                "✓".green().bold(),
                summary.rows,
                output.display()
            );
        }

        Commands::Truncate { store } => {
            let mut table = load_existing(&store)?;
            let removed = table.len();
            table.truncate();
            table.save_to(&store)?;

            println!("{} Removed {} records", "✓".green().bold(), removed);
        }

        Commands::Info { input } => {
            let pb = create_spinner("Analyzing workbook...");

            let mut package = Package::open(&input)?;
            let sheets = package.sheets().to_vec();
            let strings = package.shared_strings(None)?;
            let mut stats = RowStats::default();
            let read = sheetflow::xlsx::read_rows(
                &mut package,
                ParseType::EventDriven,
                &sheetflow::ReadOptions {
                    first_sheet_only: false,
                    ..Default::default()
                },
                &mut stats,
            )?;

            pb.finish_and_clear();

            println!("{}", "Workbook Information".cyan().bold());
            println!("{}", "─".repeat(40));
            println!(
                "{}: {}",
                "File".bold(),
                input.file_name().unwrap_or_default().to_string_lossy()
            );
            println!("{}: {}", "Sheets".bold(), sheets.len());
            for sheet in &sheets {
                println!("  {} ({})", sheet.name, sheet.part_name);
            }
            println!("{}: {}", "Shared strings".bold(), strings.len());

            println!("\n{}", "Content Statistics".cyan().bold());
            println!("{}", "─".repeat(40));
            println!("{}: {}", "Rows".bold(), read.rows);
            println!("{}: {}", "Widest row".bold(), stats.widest);
            println!("{}: {}", "Non-empty cells".bold(), stats.values);
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

/// Counts cells for `info`.
#[derive(Default)]
struct RowStats {
    widest: u32,
    values: u64,
}

impl RowCallback for RowStats {
    fn begin_row(&mut self, _row: u32) -> sheetflow::Result<()> {
        Ok(())
    }

    fn cell_value(&mut self, cell: CellEvent<'_>) -> sheetflow::Result<()> {
        self.widest = self.widest.max(cell.column + 1);
        if cell.non_blank().is_some() {
            self.values += 1;
        }
        Ok(())
    }

    fn end_row(&mut self, _row: u32) -> sheetflow::Result<()> {
        Ok(())
    }
}

fn load_existing(store: &Path) -> Result<MemoryTable, Box<dyn std::error::Error>> {
    if !store.exists() {
        return Err(format!("store {} does not exist", store.display()).into());
    }
    Ok(MemoryTable::load_from(store)?)
}

fn print_version() {
    println!("{} {}", "sheetflow".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Streaming XLSX import and export");
    println!();
    println!("Parse modes: sax, dom");
    println!("Persistence modes: jdbc, jpa");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
