//! Row/column selection over a decoded [`Table`].
//!
//! Period ranges compare labels lexicographically. That is only meaningful
//! because SDMX period labels are zero-padded and share one format per
//! frequency (`2022-Q1` < `2022-Q4` < `2023-Q1`).

use crate::models::{Column, PeriodFormat, Table};
use serde::{Deserialize, Serialize};

/// Columns whose label contains `needle`.
pub fn select_columns(table: &Table, needle: &str) -> Table {
    retain_columns(table, |label| label.contains(needle))
}

/// Columns whose label contains every needle. No needles keeps every column.
pub fn select_columns_all<S: AsRef<str>>(table: &Table, needles: &[S]) -> Table {
    retain_columns(table, |label| needles.iter().all(|n| label.contains(n.as_ref())))
}

/// Rows with `start <= period <= end`; an open bound is unbounded.
pub fn select_period_range(table: &Table, start: Option<&str>, end: Option<&str>) -> Table {
    for bound in start.iter().chain(end.iter()) {
        warn_if_format_differs(table, bound);
    }
    retain_rows(table, |p| {
        start.is_none_or(|s| p >= s) && end.is_none_or(|e| p <= e)
    })
}

/// Rows whose period starts with any of `prefixes` (e.g. `["2022", "2023"]`).
pub fn select_period_prefixes<S: AsRef<str>>(table: &Table, prefixes: &[S]) -> Table {
    retain_rows(table, |p| prefixes.iter().any(|pre| p.starts_with(pre.as_ref())))
}

fn retain_columns(table: &Table, keep: impl Fn(&str) -> bool) -> Table {
    Table {
        index_name: table.index_name.clone(),
        periods: table.periods.clone(),
        columns: table
            .columns
            .iter()
            .filter(|c| keep(&c.label))
            .cloned()
            .collect(),
    }
}

fn retain_rows(table: &Table, keep: impl Fn(&str) -> bool) -> Table {
    let rows: Vec<usize> = table
        .periods
        .iter()
        .enumerate()
        .filter(|(_, p)| keep(p))
        .map(|(i, _)| i)
        .collect();
    Table {
        index_name: table.index_name.clone(),
        periods: rows.iter().map(|&i| table.periods[i].clone()).collect(),
        columns: table
            .columns
            .iter()
            .map(|c| Column {
                label: c.label.clone(),
                values: rows.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect(),
    }
}

fn warn_if_format_differs(table: &Table, bound: &str) {
    let Some(first) = table.periods.first() else {
        return;
    };
    let (want, got) = (PeriodFormat::of(first), PeriodFormat::of(bound));
    if want != got {
        log::warn!(
            "period bound '{bound}' is {got:?} but the table uses {want:?} labels; range comparison is lexicographic"
        );
    }
}

/// A bundled selection: column needles, an inclusive period range and period prefixes.
///
/// Empty parts select everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub columns: Vec<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub prefixes: Vec<String>,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
            && self.start.is_none()
            && self.end.is_none()
            && self.prefixes.is_empty()
    }

    pub fn apply(&self, table: &Table) -> Table {
        let mut out = select_columns_all(table, &self.columns);
        if self.start.is_some() || self.end.is_some() {
            out = select_period_range(&out, self.start.as_deref(), self.end.as_deref());
        }
        if !self.prefixes.is_empty() {
            out = select_period_prefixes(&out, &self.prefixes);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    fn sample() -> Table {
        let mut t = Table::new(
            ["2021-Q4", "2022-Q1", "2022-Q2", "2023-Q1"]
                .map(String::from)
                .to_vec(),
        );
        t.push_column("USA.B1_GE", (1..=4).map(|x| Cell::Number(x as f64)).collect());
        t.push_column("CAN.B1_GE", vec![Cell::Missing; 4]);
        t.push_column("USA.P3", vec![Cell::Text("e".into()); 4]);
        t
    }

    #[test]
    fn range_is_inclusive() {
        let t = select_period_range(&sample(), Some("2022-Q1"), Some("2022-Q2"));
        assert_eq!(t.periods, vec!["2022-Q1", "2022-Q2"]);
        assert_eq!(t.get("2022-Q1", "USA.B1_GE"), Some(&Cell::Number(2.0)));
        assert_eq!(t.n_cols(), 3);
    }

    #[test]
    fn open_bounds() {
        let t = select_period_range(&sample(), None, Some("2022-Q1"));
        assert_eq!(t.periods, vec!["2021-Q4", "2022-Q1"]);
        let t = select_period_range(&sample(), Some("2022-Q2"), None);
        assert_eq!(t.periods, vec!["2022-Q2", "2023-Q1"]);
    }

    #[test]
    fn query_combines_filters() {
        let q = Query {
            columns: vec!["USA".into(), "B1_GE".into()],
            prefixes: vec!["2022".into(), "2023".into()],
            ..Default::default()
        };
        let t = q.apply(&sample());
        assert_eq!(t.labels().collect::<Vec<_>>(), vec!["USA.B1_GE"]);
        assert_eq!(t.periods, vec!["2022-Q1", "2022-Q2", "2023-Q1"]);
        assert!(Query::default().is_empty());
        assert_eq!(Query::default().apply(&sample()), sample());
    }
}
