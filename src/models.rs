use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

/// Name of the table's row index.
pub const PERIOD_INDEX: &str = "period";

/// Time window for API queries, expressed in SDMX period labels (`2000-Q1`, `2019-06`, `2020`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpec {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl PeriodSpec {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// `startTime=..&endTime=..` pairs, only for the bounds that are set.
    pub fn to_query_params(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::new();
        if let Some(s) = self.start.as_deref() {
            out.push(("startTime", s));
        }
        if let Some(e) = self.end.as_deref() {
            out.push(("endTime", e));
        }
        out
    }
}

/// Shape of an SDMX period label, used to detect tables mixing frequencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodFormat {
    Annual,
    Semester,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
    Other,
}

static PERIOD_PATTERNS: LazyLock<Vec<(Regex, PeriodFormat)>> = LazyLock::new(|| {
    [
        (r"^\d{4}$", PeriodFormat::Annual),
        (r"^\d{4}-S[12]$", PeriodFormat::Semester),
        (r"^\d{4}-Q[1-4]$", PeriodFormat::Quarterly),
        (r"^\d{4}-M?(0[1-9]|1[0-2])$", PeriodFormat::Monthly),
        (r"^\d{4}-W\d{2}$", PeriodFormat::Weekly),
        (r"^\d{4}-\d{2}-\d{2}$", PeriodFormat::Daily),
    ]
    .into_iter()
    .map(|(re, f)| (Regex::new(re).expect("valid period pattern"), f))
    .collect()
});

impl PeriodFormat {
    pub fn of(label: &str) -> Self {
        PERIOD_PATTERNS
            .iter()
            .find(|(re, _)| re.is_match(label.trim()))
            .map(|(_, f)| *f)
            .unwrap_or(PeriodFormat::Other)
    }
}

/// One table cell: a number, a textual annotation that did not coerce, or nothing.
///
/// Serializes as a bare JSON number, string, or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl Cell {
    /// Best-effort numeric coercion of an observation scalar.
    ///
    /// Strings are parsed as floats; when parsing fails the original text is kept.
    /// `NaN` (numeric or textual) is treated as a missing observation.
    /// Infinite results (`"inf"`, `"1e400"`) are kept as their text, since JSON
    /// has no representation for them.
    pub fn coerce(v: &Value) -> Cell {
        match v {
            Value::Null => Cell::Missing,
            Value::Number(n) => n.as_f64().map(Cell::from_f64).unwrap_or(Cell::Missing),
            Value::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(x) if x.is_infinite() => Cell::Text(s.clone()),
                Ok(x) => Cell::from_f64(x),
                Err(_) => Cell::Text(s.clone()),
            },
            other => Cell::Text(other.to_string()),
        }
    }

    fn from_f64(x: f64) -> Cell {
        if x.is_nan() {
            Cell::Missing
        } else if x.is_infinite() {
            Cell::Text(x.to_string())
        } else {
            Cell::Number(x)
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::from_f64(x)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(x) => write!(f, "{x}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => Ok(()),
        }
    }
}

/// One series of the decoded table, dense over the table's periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub label: String,
    pub values: Vec<Cell>,
}

/// Period-indexed table: rows are periods, columns are series.
///
/// Every column holds exactly `periods.len()` cells and labels are unique.
/// Deserialization checks both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct Table {
    pub index_name: String,
    pub periods: Vec<String>,
    pub columns: Vec<Column>,
}

/// Unchecked serialized form of [`Table`].
#[derive(Deserialize)]
struct TableParts {
    #[serde(default = "default_index_name")]
    index_name: String,
    periods: Vec<String>,
    columns: Vec<Column>,
}

impl TryFrom<TableParts> for Table {
    type Error = String;

    fn try_from(parts: TableParts) -> Result<Self, Self::Error> {
        let rows = parts.periods.len();
        Table::try_from_parts(parts.index_name, parts.periods, parts.columns).map_err(|c| {
            format!(
                "column '{}' has {} values for {} periods or repeats a label",
                c.label,
                c.values.len(),
                rows
            )
        })
    }
}

fn default_index_name() -> String {
    PERIOD_INDEX.to_string()
}

impl Table {
    pub fn new(periods: Vec<String>) -> Self {
        Self {
            index_name: default_index_name(),
            periods,
            columns: Vec::new(),
        }
    }

    /// Build a table from loose parts, applying the [`Table::push_column`] checks.
    ///
    /// Returns the first column that does not fit.
    pub fn try_from_parts(
        index_name: String,
        periods: Vec<String>,
        columns: Vec<Column>,
    ) -> Result<Self, Column> {
        let mut table = Table {
            index_name,
            periods,
            columns: Vec::with_capacity(columns.len()),
        };
        for col in columns {
            if table.column(&col.label).is_some() || col.values.len() != table.n_rows() {
                return Err(col);
            }
            table.columns.push(col);
        }
        Ok(table)
    }

    /// Append a column. Returns `false` (and leaves the table untouched) when the
    /// label already exists or the column length does not match the row count.
    pub fn push_column(&mut self, label: impl Into<String>, values: Vec<Cell>) -> bool {
        let label = label.into();
        if values.len() != self.periods.len() || self.column(&label).is_some() {
            return false;
        }
        self.columns.push(Column { label, values });
        true
    }

    pub fn n_rows(&self) -> usize {
        self.periods.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() || self.columns.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.label.as_str())
    }

    pub fn column(&self, label: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.label == label)
    }

    pub fn row_position(&self, period: &str) -> Option<usize> {
        self.periods.iter().position(|p| p == period)
    }

    /// Cell lookup by period label and column label.
    pub fn get(&self, period: &str, label: &str) -> Option<&Cell> {
        let row = self.row_position(period)?;
        self.column(label).and_then(|c| c.values.get(row))
    }

    /// Iterate `(period, cells)` row by row in column order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, Vec<&Cell>)> {
        self.periods.iter().enumerate().map(move |(i, p)| {
            let cells = self.columns.iter().map(|c| &c.values[i]).collect();
            (p.as_str(), cells)
        })
    }
}

impl fmt::Display for Table {
    /// Plain aligned text rendering, one line per period.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = Vec::with_capacity(self.columns.len() + 1);
        let idx_w = self
            .periods
            .iter()
            .map(|p| p.len())
            .chain(std::iter::once(self.index_name.len()))
            .max()
            .unwrap_or(0);
        widths.push(idx_w);
        for c in &self.columns {
            let w = c
                .values
                .iter()
                .map(|v| v.to_string().len().max(3))
                .chain(std::iter::once(c.label.len()))
                .max()
                .unwrap_or(0);
            widths.push(w);
        }

        write!(f, "{:<w$}", self.index_name, w = widths[0])?;
        for (c, w) in self.columns.iter().zip(&widths[1..]) {
            write!(f, "  {:>w$}", c.label, w = *w)?;
        }
        writeln!(f)?;
        for (period, cells) in self.rows() {
            write!(f, "{:<w$}", period, w = widths[0])?;
            for (cell, w) in cells.into_iter().zip(&widths[1..]) {
                let s = match cell {
                    Cell::Missing => "NaN".to_string(),
                    other => other.to_string(),
                };
                write!(f, "  {:>w$}", s, w = *w)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
