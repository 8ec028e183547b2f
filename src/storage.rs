use crate::models::{Cell, Table};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde_json::Value;
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;

/// Prefix cells that a spreadsheet would evaluate as a formula with `'`.
/// Numeric-looking text (`-1.5`) is left alone.
fn csv_safe(s: &str) -> Cow<'_, str> {
    let risky = s.starts_with(['=', '+', '-', '@']);
    if risky && s.parse::<f64>().is_err() {
        Cow::Owned(format!("'{s}"))
    } else {
        Cow::Borrowed(s)
    }
}

fn csv_cell(c: &Cell) -> Cow<'_, str> {
    match c {
        Cell::Number(x) => Cow::Owned(x.to_string()),
        Cell::Text(s) => csv_safe(s),
        Cell::Missing => Cow::Borrowed(""),
    }
}

/// Save the table as CSV: a `period` column followed by one column per series.
pub fn save_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;

    let mut header: Vec<Cow<'_, str>> = vec![csv_safe(&table.index_name)];
    header.extend(table.labels().map(csv_safe));
    wtr.write_record(header.iter().map(|h| h.as_bytes()))?;

    for (period, cells) in table.rows() {
        let mut record: Vec<Cow<'_, str>> = Vec::with_capacity(cells.len() + 1);
        record.push(csv_safe(period));
        record.extend(cells.into_iter().map(csv_cell));
        wtr.write_record(record.iter().map(|c| c.as_bytes()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the table as pretty JSON (`{"index_name", "periods", "columns"}`).
pub fn save_json<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    write_pretty(table, path.as_ref())
}

/// Read a table written by [`save_json`].
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let table: Table = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse table from {}", path.display()))?;
    Ok(table)
}

/// Save a fetched tree (SDMX-JSON or XML-derived) as pretty JSON for offline querying.
pub fn save_tree<P: AsRef<Path>>(tree: &Value, path: P) -> Result<()> {
    write_pretty(tree, path.as_ref())
}

/// Read a tree written by [`save_tree`] (or any JSON file).
pub fn load_tree<P: AsRef<Path>>(path: P) -> Result<Value> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse json from {}", path.display()))
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
        log::info!("created directory {}", dir.display());
    }
    Ok(())
}

fn write_pretty<T: serde::Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let mut f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let s = serde_json::to_string_pretty(value)?;
    f.write_all(s.as_bytes())?;
    Ok(())
}
