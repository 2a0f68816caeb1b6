//! FundLab CLI — fund extract ingestion, metrics tables, chart exports.
//!
//! Commands:
//! - `report` — ingest extract CSVs, compute per-fund metrics, print a
//!   ranked table and optionally save JSON/CSV artifacts
//! - `chart` — print the aligned (optionally rebased) series as CSV for
//!   external plotting
//!
//! Extract files are processed in filename order; with date-stamped extract
//! names this puts the oldest covering window first, so later re-extracts
//! supersede older ones deterministically.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use fundlab_core::data::{
    adjust_split, align, merge_batches, parse_extract, AlignMode, ExtractLayout, RawBatch,
    RawTable,
};
use fundlab_core::domain::{latest_fees, Category, DateRange, FeeRecord, InstrumentSeries};
use fundlab_core::metrics::{compute_detailed, compute_metrics, DetailedMetrics};
use fundlab_core::rank::{rank, RankedEntry, SortDirection, SortKey};

#[derive(Parser)]
#[command(name = "fundlab", about = "FundLab CLI — fund series analytics engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest extract CSVs and print a ranked metrics table.
    Report {
        /// Directory of extract CSV files (processed in filename order).
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Path to a TOML config file carrying these same options.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Fee CSV (instrument_id, management_fee, custodian_fee,
        /// guarantee_fee, other_fee, total_expense_ratio, as_of).
        #[arg(long)]
        fees: Option<PathBuf>,

        /// Valuation convention of the extracts: nav or market.
        #[arg(long, default_value = "nav")]
        category: String,

        /// Header of the instrument identifier column.
        #[arg(long, default_value = "fund_id")]
        id_column: String,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: Option<String>,

        /// Detect and correct single split events before computing metrics.
        #[arg(long, default_value_t = false)]
        adjust_splits: bool,

        /// Sort key: instrument, return_1m/3m/6m/1y/3y/ytd, volatility,
        /// sharpe, sortino, max_drawdown, win_rate, total_expense_ratio.
        #[arg(long, default_value = "return_1y")]
        sort: String,

        /// Sort ascending instead of descending.
        #[arg(long, default_value_t = false)]
        ascending: bool,

        /// Print the detailed monthly-frequency block per fund.
        #[arg(long, default_value_t = false)]
        detailed: bool,

        /// Directory for JSON/CSV artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print aligned series values as CSV for external plotting.
    Chart {
        /// Directory of extract CSV files (processed in filename order).
        #[arg(long)]
        data_dir: PathBuf,

        /// Valuation convention of the extracts: nav or market.
        #[arg(long, default_value = "nav")]
        category: String,

        /// Header of the instrument identifier column.
        #[arg(long, default_value = "fund_id")]
        id_column: String,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        end: Option<String>,

        /// Value mode: absolute or rebased.
        #[arg(long, default_value = "absolute")]
        mode: String,

        /// Detect and correct single split events before aligning.
        #[arg(long, default_value_t = false)]
        adjust_splits: bool,
    },
}

/// Serializable `report` options, loadable from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportConfig {
    data_dir: PathBuf,
    fees: Option<PathBuf>,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_id_column")]
    id_column: String,
    start: Option<String>,
    end: Option<String>,
    #[serde(default)]
    adjust_splits: bool,
    #[serde(default = "default_sort")]
    sort: String,
    #[serde(default)]
    ascending: bool,
    #[serde(default)]
    detailed: bool,
    output_dir: Option<PathBuf>,
}

fn default_category() -> String {
    "nav".into()
}

fn default_id_column() -> String {
    "fund_id".into()
}

fn default_sort() -> String {
    "return_1y".into()
}

impl ReportConfig {
    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config: {}", path.display()))
    }
}

/// Everything `report` produces, also written as the JSON artifact.
#[derive(Debug, Serialize, Deserialize)]
struct ReportArtifact {
    generated_at: String,
    category: Category,
    entries: Vec<RankedEntry>,
    detailed: HashMap<String, DetailedMetrics>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            data_dir,
            config,
            fees,
            category,
            id_column,
            start,
            end,
            adjust_splits,
            sort,
            ascending,
            detailed,
            output_dir,
        } => {
            let cfg = if let Some(path) = config {
                if data_dir.is_some() {
                    bail!("--config and --data-dir are mutually exclusive");
                }
                ReportConfig::from_file(&path)?
            } else {
                let Some(data_dir) = data_dir else {
                    bail!("--data-dir is required without --config");
                };
                ReportConfig {
                    data_dir,
                    fees,
                    category,
                    id_column,
                    start,
                    end,
                    adjust_splits,
                    sort,
                    ascending,
                    detailed,
                    output_dir,
                }
            };
            run_report(&cfg)
        }
        Commands::Chart {
            data_dir,
            category,
            id_column,
            start,
            end,
            mode,
            adjust_splits,
        } => run_chart(
            &data_dir,
            &category,
            &id_column,
            start.as_deref(),
            end.as_deref(),
            &mode,
            adjust_splits,
        ),
    }
}

// ─── Option parsing ─────────────────────────────────────────────────

fn parse_category(text: &str) -> Result<Category> {
    match text {
        "nav" => Ok(Category::Nav),
        "market" => Ok(Category::Market),
        other => bail!("unknown category '{other}' (expected nav or market)"),
    }
}

fn parse_sort_key(text: &str) -> Result<SortKey> {
    Ok(match text {
        "instrument" => SortKey::Instrument,
        "return_1m" => SortKey::Return1m,
        "return_3m" => SortKey::Return3m,
        "return_6m" => SortKey::Return6m,
        "return_1y" => SortKey::Return1y,
        "return_3y" => SortKey::Return3y,
        "return_ytd" => SortKey::ReturnYtd,
        "volatility" => SortKey::Volatility,
        "sharpe" => SortKey::Sharpe,
        "sortino" => SortKey::Sortino,
        "max_drawdown" => SortKey::MaxDrawdown,
        "win_rate" => SortKey::WinRate,
        "total_expense_ratio" => SortKey::TotalExpenseRatio,
        other => bail!("unknown sort key '{other}'"),
    })
}

fn parse_mode(text: &str) -> Result<AlignMode> {
    match text {
        "absolute" => Ok(AlignMode::Absolute),
        "rebased" => Ok(AlignMode::RebasedPercent),
        other => bail!("unknown mode '{other}' (expected absolute or rebased)"),
    }
}

fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange> {
    let parse = |text: &str| {
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{text}' (expected YYYY-MM-DD)"))
    };
    Ok(DateRange::new(
        start.map(parse).transpose()?,
        end.map(parse).transpose()?,
    ))
}

// ─── Extract and fee file loading ───────────────────────────────────

/// Read one extract CSV into a raw table. Rows may be ragged.
fn read_table(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open extract: {}", path.display()))?;

    let columns = reader
        .headers()
        .with_context(|| format!("failed to read headers: {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("malformed row in {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { columns, rows })
}

/// Load every `.csv` in the directory, sorted by filename — the merge's
/// deterministic oldest-first precedence order.
fn load_tables(data_dir: &Path) -> Result<Vec<RawTable>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(data_dir)
        .with_context(|| format!("failed to read data dir: {}", data_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    paths.sort();

    paths.iter().map(|p| read_table(p)).collect()
}

fn load_fees(path: &Path) -> Result<Vec<FeeRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open fee file: {}", path.display()))?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        let record: FeeRecord =
            record.with_context(|| format!("malformed fee row in {}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Ingest all extracts in a directory into clean per-instrument series.
fn load_series(
    data_dir: &Path,
    category: Category,
    id_column: &str,
    range: &DateRange,
    adjust_splits: bool,
) -> Result<Vec<InstrumentSeries>> {
    let tables = load_tables(data_dir)?;
    let layout = ExtractLayout {
        id_column: id_column.to_string(),
        category,
    };

    let mut batches: Vec<RawBatch> = Vec::new();
    for table in &tables {
        batches.extend(parse_extract(table, &layout)?);
    }

    let series = merge_batches(&batches, range);
    if adjust_splits {
        Ok(series.par_iter().map(adjust_split).collect())
    } else {
        Ok(series)
    }
}

// ─── report ─────────────────────────────────────────────────────────

fn run_report(cfg: &ReportConfig) -> Result<()> {
    let category = parse_category(&cfg.category)?;
    let key = parse_sort_key(&cfg.sort)?;
    let direction = if cfg.ascending {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    let range = parse_range(cfg.start.as_deref(), cfg.end.as_deref())?;

    let series = load_series(
        &cfg.data_dir,
        category,
        &cfg.id_column,
        &range,
        cfg.adjust_splits,
    )?;

    let fees = match &cfg.fees {
        Some(path) => latest_fees(&load_fees(path)?),
        None => HashMap::new(),
    };

    let entries: Vec<RankedEntry> = series
        .par_iter()
        .map(|s| {
            RankedEntry::new(s.instrument_id.clone(), s.category, compute_metrics(s))
                .with_fees(&fees)
        })
        .collect();

    let detailed: HashMap<String, DetailedMetrics> = series
        .par_iter()
        .filter_map(|s| compute_detailed(s).map(|d| (s.instrument_id.clone(), d)))
        .collect();

    let ranked = rank(entries, key, direction);

    print_table(&ranked);
    if cfg.detailed {
        for entry in &ranked {
            if let Some(d) = detailed.get(&entry.instrument_id) {
                print_detailed(&entry.instrument_id, d);
            }
        }
    }

    if let Some(output_dir) = &cfg.output_dir {
        let artifact = ReportArtifact {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            category,
            entries: ranked,
            detailed,
        };
        let report_dir = save_artifacts(&artifact, output_dir)?;
        println!("Artifacts saved to: {}", report_dir.display());
    }

    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".into(), |v| format!("{v:.2}"))
}

fn print_table(entries: &[RankedEntry]) {
    println!(
        "{:<10} {:<7} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>6}",
        "Fund", "Cat", "1M%", "3M%", "6M%", "1Y%", "YTD%", "Vol%", "Sharpe", "MaxDD%", "TER%"
    );
    println!("{}", "-".repeat(96));
    for e in entries {
        println!(
            "{:<10} {:<7} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>6}",
            e.instrument_id,
            e.category.as_str(),
            fmt_opt(e.metrics.return_1m),
            fmt_opt(e.metrics.return_3m),
            fmt_opt(e.metrics.return_6m),
            fmt_opt(e.metrics.return_1y),
            fmt_opt(e.metrics.return_ytd),
            fmt_opt(e.metrics.volatility),
            fmt_opt(e.metrics.sharpe),
            fmt_opt(e.metrics.max_drawdown),
            fmt_opt(e.fees.as_ref().map(|f| f.total_expense_ratio)),
        );
    }
}

fn print_detailed(instrument_id: &str, d: &DetailedMetrics) {
    println!();
    println!("=== {instrument_id} ===");
    println!("Annualized return: {:>8}%", fmt_opt(d.annualized_return));
    println!("Max drawdown:      {:>8}%", fmt_opt(d.max_drawdown));
    println!("Calmar:            {:>8}", fmt_opt(d.calmar));
    println!("Monthly VaR95:     {:>8}%", fmt_opt(d.var_95));
    println!("Monthly CVaR95:    {:>8}%", fmt_opt(d.cvar_95));
    println!("Skewness:          {:>8}", fmt_opt(d.skewness));
    println!("Excess kurtosis:   {:>8}", fmt_opt(d.kurtosis));
    println!("Profit factor:     {:>8.2}", d.profit_factor);
    println!(
        "Avg month gain/loss: {:.2}% / {:.2}%",
        d.avg_monthly_gain, d.avg_monthly_loss
    );
    println!(
        "Months up/down:    {} / {} ({} daily returns)",
        d.positive_months, d.negative_months, d.sample_size
    );
}

/// Write report.json and metrics.csv under a timestamped directory.
fn save_artifacts(artifact: &ReportArtifact, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "report_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let report_dir = output_dir.join(dirname);
    fs::create_dir_all(&report_dir)
        .with_context(|| format!("failed to create artifact dir: {}", report_dir.display()))?;

    let json = serde_json::to_string_pretty(artifact)
        .context("failed to serialize report to JSON")?;
    fs::write(report_dir.join("report.json"), &json)?;

    fs::write(report_dir.join("metrics.csv"), metrics_csv(&artifact.entries)?)?;

    Ok(report_dir)
}

fn metrics_csv(entries: &[RankedEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument_id",
        "category",
        "return_1m",
        "return_3m",
        "return_6m",
        "return_1y",
        "return_3y",
        "return_ytd",
        "volatility",
        "sharpe",
        "sortino",
        "win_rate",
        "max_drawdown",
        "total_expense_ratio",
    ])?;
    for e in entries {
        wtr.write_record([
            e.instrument_id.clone(),
            e.category.as_str().to_string(),
            fmt_opt(e.metrics.return_1m),
            fmt_opt(e.metrics.return_3m),
            fmt_opt(e.metrics.return_6m),
            fmt_opt(e.metrics.return_1y),
            fmt_opt(e.metrics.return_3y),
            fmt_opt(e.metrics.return_ytd),
            fmt_opt(e.metrics.volatility),
            fmt_opt(e.metrics.sharpe),
            fmt_opt(e.metrics.sortino),
            fmt_opt(e.metrics.win_rate),
            fmt_opt(e.metrics.max_drawdown),
            fmt_opt(e.fees.as_ref().map(|f| f.total_expense_ratio)),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush metrics CSV")?;
    String::from_utf8(bytes).context("metrics CSV was not valid UTF-8")
}

// ─── chart ──────────────────────────────────────────────────────────

fn run_chart(
    data_dir: &Path,
    category: &str,
    id_column: &str,
    start: Option<&str>,
    end: Option<&str>,
    mode: &str,
    adjust_splits: bool,
) -> Result<()> {
    let category = parse_category(category)?;
    let mode = parse_mode(mode)?;
    let range = parse_range(start, end)?;

    let series = load_series(data_dir, category, id_column, &range, adjust_splits)?;
    let aligned = align(&series, mode);

    print!("{}", aligned_csv(&aligned)?);
    Ok(())
}

fn aligned_csv(aligned: &fundlab_core::data::AlignedSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date".to_string()];
    header.extend(aligned.instruments.iter().cloned());
    wtr.write_record(&header)?;

    for (i, date) in aligned.dates.iter().enumerate() {
        let mut row = vec![date.to_string()];
        for id in &aligned.instruments {
            row.push(match aligned.values[id][i] {
                Some(v) => format!("{v:.4}"),
                None => String::new(),
            });
        }
        wtr.write_record(&row)?;
    }

    let bytes = wtr.into_inner().context("failed to flush chart CSV")?;
    String::from_utf8(bytes).context("chart CSV was not valid UTF-8")
}
