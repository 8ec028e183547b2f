use super::{KEY_SEPARATOR, LABEL_SEPARATOR};
use crate::error::DecodeError;
use crate::models::{Cell, Table};
use serde_json::Value;

/// Decode a native SDMX-JSON message into a period-indexed table.
///
/// Rows are the observation dimension's declared values, verbatim and in order.
/// Columns follow the order of `dataSets[0].series`; each label is the series'
/// resolved dimension ids joined with `.`.
///
/// Both the SDMX-JSON 1.0 layout (`structure` next to `dataSets`) and the 2.0
/// envelope (`data.dataSets` + `data.structures[0]`) are accepted.
///
/// ### Errors
/// - [`DecodeError::MissingObservationDimension`]: no period values declared
/// - [`DecodeError::MalformedStructure`]: series dimensions or series container missing
/// - [`DecodeError::KeyArityMismatch`]: series key with the wrong number of parts
/// - [`DecodeError::DimensionIndexOutOfRange`]: key position past its dimension
/// - [`DecodeError::InvalidRowIndex`]: observation key not a valid period position
pub fn decode(tree: &Value) -> Result<Table, DecodeError> {
    let root = match tree.get("data") {
        Some(data) if data.get("dataSets").is_some() => data,
        _ => tree,
    };
    let dimensions = root
        .get("structure")
        .or_else(|| root.pointer("/structures/0"))
        .and_then(|s| s.get("dimensions"));

    let periods = observation_periods(dimensions)?;
    let lookups = series_lookups(dimensions)?;

    let series = root
        .pointer("/dataSets/0/series")
        .and_then(Value::as_object)
        .ok_or_else(|| DecodeError::MalformedStructure("dataSets[0].series not found".into()))?;

    let mut table = Table::new(periods);
    for (key, body) in series {
        let label = resolve_label(key, &lookups)?;
        let values = scatter_observations(&label, body, table.n_rows())?;
        // Distinct keys only collide when a dimension declares duplicate ids.
        if !table.push_column(label.clone(), values) {
            return Err(DecodeError::MalformedStructure(format!(
                "series '{key}' resolves to duplicate column '{label}'"
            )));
        }
    }
    log::debug!(
        "decoded {} series over {} periods",
        table.n_cols(),
        table.n_rows()
    );
    Ok(table)
}

fn observation_periods(dimensions: Option<&Value>) -> Result<Vec<String>, DecodeError> {
    let values = dimensions
        .and_then(|d| d.pointer("/observation/0/values"))
        .and_then(Value::as_array)
        .filter(|v| !v.is_empty())
        .ok_or(DecodeError::MissingObservationDimension)?;
    values
        .iter()
        .map(|v| value_id(v).ok_or_else(|| missing_id("observation")))
        .collect()
}

/// One ordered id list per series dimension, in declaration order.
fn series_lookups(dimensions: Option<&Value>) -> Result<Vec<Vec<String>>, DecodeError> {
    let dims = dimensions
        .and_then(|d| d.get("series"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DecodeError::MalformedStructure("structure.dimensions.series not found".into())
        })?;
    dims.iter()
        .map(|dim| {
            dim.get("values")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .map(|v| value_id(v).ok_or_else(|| missing_id("series")))
                .collect()
        })
        .collect()
}

fn value_id(v: &Value) -> Option<String> {
    match v.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn missing_id(group: &str) -> DecodeError {
    DecodeError::MalformedStructure(format!("{group} dimension value without an 'id'"))
}

fn resolve_label(key: &str, lookups: &[Vec<String>]) -> Result<String, DecodeError> {
    let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    if parts.len() != lookups.len() {
        return Err(DecodeError::KeyArityMismatch {
            key: key.to_string(),
            expected: lookups.len(),
            found: parts.len(),
        });
    }

    let mut ids = Vec::with_capacity(parts.len());
    for (dimension, (part, values)) in parts.iter().zip(lookups).enumerate() {
        let position: usize = part.trim().parse().map_err(|_| {
            DecodeError::MalformedStructure(format!(
                "series key '{key}' has non-integer component '{part}'"
            ))
        })?;
        let id = values
            .get(position)
            .ok_or_else(|| DecodeError::DimensionIndexOutOfRange {
                key: key.to_string(),
                dimension,
                position,
                len: values.len(),
            })?;
        ids.push(id.as_str());
    }
    Ok(ids.join(LABEL_SEPARATOR))
}

fn scatter_observations(label: &str, body: &Value, rows: usize) -> Result<Vec<Cell>, DecodeError> {
    let mut values = vec![Cell::Missing; rows];
    let observations = match body.get("observations") {
        None | Some(Value::Null) => return Ok(values),
        Some(Value::Object(obs)) => obs,
        Some(_) => {
            return Err(DecodeError::MalformedStructure(format!(
                "series '{label}': observations is not a map"
            )));
        }
    };

    for (index, raw) in observations {
        let row = index
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|r| *r < rows)
            .ok_or_else(|| DecodeError::InvalidRowIndex {
                series: label.to_string(),
                index: index.clone(),
                rows,
            })?;
        // Observation arrays carry the value first, followed by attribute indices.
        let scalar = match raw {
            Value::Array(items) => items.first().unwrap_or(&Value::Null),
            other => other,
        };
        values[row] = Cell::coerce(scalar);
    }
    Ok(values)
}
