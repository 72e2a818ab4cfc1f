use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde_json::json;

use rusty_events::query::parse_constraint;
use rusty_events::{
    Dataset, EventTable, Events, Method, OverlapPolicy, SelectConfig, Selection, UnknownPolicy,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "rusty-events")]
#[command(version)]
#[command(about = "Select across a labeled dataset and its events in one pass")]
#[command(long_about = "Select across a labeled dataset and its events in one pass

CONSTRAINTS (-w/--where, repeatable):
  label=spike        equality
  channel=a,b,c      membership
  time>2.5           comparison (also >=, <, <=, !=)

Names matching a dataset dimension select along it; names matching an event
column filter the events.

EXAMPLES:
  rusty-events -d sample_dataset.json -e sample_events.csv -w channel=a -w label=spike
  rusty-events -d sample_dataset.json -e sample_events.parquet -w time=2.4 --method nearest --tolerance 0.5")]
struct Args {
    /// Dataset JSON file
    #[arg(short, long, value_name = "FILE")]
    dataset: PathBuf,

    /// Events file (.csv, .json, .parquet)
    #[arg(short, long, value_name = "FILE")]
    events: Option<PathBuf>,

    /// Constraint expression
    #[arg(short = 'w', long = "where", value_name = "EXPR")]
    constraints: Vec<String>,

    /// Inexact label matching: nearest, pad (ffill), backfill (bfill)
    #[arg(long)]
    method: Option<Method>,

    /// Maximum distance for inexact matches
    #[arg(long, requires = "method")]
    tolerance: Option<f64>,

    /// Drop coordinates of dimensions collapsed by scalar selection
    #[arg(long)]
    drop: bool,

    /// Selection config JSON file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Route names that are both a dimension and a column to both
    #[arg(long)]
    overlap_both: bool,

    /// Skip constraints that match neither a dimension nor a column
    #[arg(long)]
    ignore_unknown: bool,

    /// Output format for the events
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SelectConfig::from_path(path)?,
        None => SelectConfig::default(),
    };
    if args.overlap_both {
        config.overlap = OverlapPolicy::Both;
    }
    if args.ignore_unknown {
        config.unknown = UnknownPolicy::Ignore;
    }

    let dataset = Dataset::from_path(&args.dataset)?;
    let mut events = Events::with_config(dataset, config);
    if let Some(path) = &args.events {
        events.load(path.clone())?;
    }

    let mut selection = Selection::new().drop(args.drop);
    if let Some(method) = args.method {
        selection = selection.method(method);
    }
    if let Some(tolerance) = args.tolerance {
        selection = selection.tolerance(tolerance);
    }
    for expr in &args.constraints {
        let (name, constraint) = parse_constraint(expr)?;
        selection = selection.with(name, constraint);
    }
    events.sel(selection)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Csv => write_csv(&mut out, &events)?,
        OutputFormat::Json => write_json(&mut out, &events)?,
    }
    Ok(())
}

fn dims_summary(ds: &Dataset) -> String {
    ds.sizes()
        .iter()
        .map(|(d, n)| format!("{d}={n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_csv(out: &mut impl Write, events: &Events<Dataset>) -> Result<()> {
    writeln!(out, "# dims: {}", dims_summary(events.array()))?;
    let Some(table) = events.events() else {
        writeln!(out, "# no events loaded")?;
        return Ok(());
    };
    writeln!(out, "# events: {}", table.len())?;
    write_table(out, table)
}

fn write_table(out: &mut impl Write, table: &EventTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(table.column_names())
        .context("writing CSV header")?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|v| if v.is_null() { String::new() } else { v.to_string() }))
            .context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_json(out: &mut impl Write, events: &Events<Dataset>) -> Result<()> {
    let ds = events.array();
    let sizes: serde_json::Map<String, serde_json::Value> = ds
        .sizes()
        .into_iter()
        .map(|(d, n)| (d.to_string(), json!(n)))
        .collect();
    let doc = json!({
        "dims": sizes,
        "variables": ds.variable_names().collect::<Vec<_>>(),
        "events": events.events().map(|t| t.to_records()),
        "event_ids": events.events().map(|t| t.event_ids()),
    });
    serde_json::to_writer_pretty(&mut *out, &doc).context("writing JSON")?;
    writeln!(out)?;
    Ok(())
}
