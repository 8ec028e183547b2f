use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use oecd_rs::api::SdmxFormat;
use oecd_rs::config::{self, ClientConfig, DatasetSpec};
use oecd_rs::query::Query;
use oecd_rs::{Client, PeriodSpec, Table, decode_any, stats, storage};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "oecd",
    version,
    about = "Fetch OECD SDMX data, reshape it into period-indexed tables, and query it"
)]
struct Cli {
    /// Increase log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Request timeout in seconds.
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch one dataset, decode it, and optionally save, filter, and summarize it.
    Fetch(FetchArgs),
    /// Download every dataset of a batch list as raw trees into a data directory.
    Update(UpdateArgs),
    /// Decode a saved raw tree and filter it offline.
    Query(QueryArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Keep columns whose label contains this text (repeat to require several).
    #[arg(short = 'c', long = "column")]
    columns: Vec<String>,
    /// First period to keep (inclusive), e.g. 2022-Q1.
    #[arg(long)]
    from: Option<String>,
    /// Last period to keep (inclusive), e.g. 2024-Q4.
    #[arg(long)]
    to: Option<String>,
    /// Keep periods starting with this prefix (repeatable), e.g. 2022.
    #[arg(long = "prefix")]
    prefixes: Vec<String>,
}

impl FilterArgs {
    fn to_query(&self) -> Query {
        Query {
            columns: self.columns.clone(),
            start: self.from.clone(),
            end: self.to.clone(),
            prefixes: self.prefixes.clone(),
        }
    }
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Save the (filtered) table to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Print per-column statistics to stdout.
    #[arg(long, default_value_t = false)]
    stats: bool,
    /// Do not print the table itself.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Dataset code (e.g., QNA)
    #[arg(short, long)]
    dataset: String,
    /// SDMX series key (e.g., Q..USA+CAN.B1_GE.CQRSA)
    #[arg(short, long, default_value = "all")]
    query: String,
    /// Start period sent to the API (e.g., 2000-Q1)
    #[arg(long)]
    start: Option<String>,
    /// End period sent to the API (e.g., 2025-Q3)
    #[arg(long)]
    end: Option<String>,
    /// Use the legacy SDMX-ML endpoint instead of SDMX-JSON.
    #[arg(long, default_value_t = false)]
    xml: bool,
    /// Save the raw fetched tree as JSON.
    #[arg(long)]
    raw: Option<PathBuf>,
    #[command(flatten)]
    filter: FilterArgs,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    /// JSON file with a list of {name, dataset_code, query}; built-in list if omitted.
    #[arg(long)]
    datasets: Option<PathBuf>,
    /// Directory the raw trees are written to.
    #[arg(long, default_value = config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,
    /// Fetch SDMX-JSON instead of SDMX-ML.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Saved tree (from `fetch --raw` or `update`).
    #[arg(short, long)]
    input: PathBuf,
    #[command(flatten)]
    filter: FilterArgs,
    #[command(flatten)]
    output: OutputArgs,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = ClientConfig {
        timeout: Duration::from_secs(cli.timeout),
        ..ClientConfig::default()
    };
    match cli.cmd {
        Command::Fetch(args) => cmd_fetch(&cfg, args),
        Command::Update(args) => cmd_update(&cfg, args),
        Command::Query(args) => cmd_query(args),
    }
}

fn cmd_fetch(cfg: &ClientConfig, args: FetchArgs) -> Result<()> {
    let client = Client::new(cfg)?;
    let period = PeriodSpec {
        start: args.start.clone(),
        end: args.end.clone(),
    };
    let format = if args.xml {
        SdmxFormat::Xml
    } else {
        SdmxFormat::Json
    };

    let tree = client.fetch_tree(&args.dataset, &args.query, Some(&period), format)?;
    if let Some(path) = args.raw.as_ref() {
        storage::save_tree(&tree, path)?;
        eprintln!("Saved raw data to {}", path.display());
    }
    let table = decode_any(&tree).with_context(|| format!("decode {}", args.dataset))?;
    report(&table, &args.filter.to_query(), &args.output)
}

fn cmd_update(cfg: &ClientConfig, args: UpdateArgs) -> Result<()> {
    let specs: Vec<DatasetSpec> = match args.datasets.as_ref() {
        Some(path) => config::load_datasets(path)?,
        None => config::default_datasets(),
    };
    storage::ensure_dir(&args.data_dir)?;
    let client = Client::new(cfg)?;
    let format = if args.json {
        SdmxFormat::Json
    } else {
        SdmxFormat::Xml
    };

    let total = specs.len();
    let mut ok = 0usize;
    for (i, spec) in specs.iter().enumerate() {
        eprintln!("--- Processing {}/{}: {} ---", i + 1, total, spec.name);
        let path = args.data_dir.join(format!("{}.json", spec.name));
        match update_one(&client, spec, format, &path) {
            Ok(()) => {
                eprintln!("Saved to {}", path.display());
                ok += 1;
            }
            Err(e) => {
                log::error!("{}: {:#}", spec.name, e);
                eprintln!("ERROR fetching or saving {}: {:#}", spec.name, e);
            }
        }
    }
    println!("Successfully fetched {} / {} datasets.", ok, total);
    Ok(())
}

fn update_one(client: &Client, spec: &DatasetSpec, format: SdmxFormat, path: &Path) -> Result<()> {
    let tree = client.fetch_tree(&spec.dataset_code, &spec.query, None, format)?;
    storage::save_tree(&tree, path)
}

fn cmd_query(args: QueryArgs) -> Result<()> {
    let tree = storage::load_tree(&args.input)?;
    let table = decode_any(&tree)
        .with_context(|| format!("decode {}", args.input.display()))?;
    eprintln!(
        "Columns found (sample): {:?}",
        table.labels().take(30).collect::<Vec<_>>()
    );
    report(&table, &args.filter.to_query(), &args.output)
}

/// Filter, then save / print / summarize according to the output flags.
fn report(table: &Table, query: &Query, output: &OutputArgs) -> Result<()> {
    let selected = query.apply(table);
    if !query.columns.is_empty() && selected.n_cols() == 0 {
        eprintln!("No columns match {:?}", query.columns);
    }

    if let Some(path) = output.out.as_ref() {
        let fmt = match output.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&selected, path)?,
            "json" => storage::save_json(&selected, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!(
            "Saved {} periods x {} series to {}",
            selected.n_rows(),
            selected.n_cols(),
            path.display()
        );
    }

    if !output.quiet {
        print!("{selected}");
    }

    if output.stats {
        for s in stats::column_summary(&selected) {
            println!(
                "{}  count={} missing={} text={}  min={} max={} mean={} median={}",
                s.label,
                s.count,
                s.missing,
                s.text,
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
                fmt_opt(s.median)
            );
        }
    }
    Ok(())
}
