use crate::models::{Cell, Table};
use serde::{Deserialize, Serialize};

/// Summary statistics for one table column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub label: String,
    /// Numeric cells.
    pub count: usize,
    pub missing: usize,
    /// Cells kept as text because they did not coerce to a number.
    pub text: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute statistics per column, in column order.
pub fn column_summary(table: &Table) -> Vec<Summary> {
    table
        .columns
        .iter()
        .map(|col| {
            let mut vals: Vec<f64> = Vec::new();
            let (mut missing, mut text) = (0, 0);
            for c in &col.values {
                match c {
                    Cell::Number(x) => vals.push(*x),
                    Cell::Text(_) => text += 1,
                    Cell::Missing => missing += 1,
                }
            }
            vals.sort_by(f64::total_cmp);
            let count = vals.len();
            let mean = (count > 0).then(|| vals.iter().sum::<f64>() / count as f64);
            let median = if count == 0 {
                None
            } else if count % 2 == 1 {
                Some(vals[count / 2])
            } else {
                Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
            };
            Summary {
                label: col.label.clone(),
                count,
                missing,
                text,
                min: vals.first().copied(),
                max: vals.last().copied(),
                mean,
                median,
            }
        })
        .collect()
}
