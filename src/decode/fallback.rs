use super::{LABEL_SEPARATOR, as_records};
use crate::error::DecodeError;
use crate::models::{Cell, PeriodFormat, Table};
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Locates the series container of one known layout, or `None` if the tree is not in it.
pub type ShapeProbe = fn(&Value) -> Option<&Value>;

/// Known XML-derived layouts, probed in this order.
pub const SHAPES: &[(&str, ShapeProbe)] = &[
    ("GenericData/DataSet/Series", generic_data),
    ("CompactData/DataSet/Series", compact_data),
    ("DataSet/Series", bare_dataset),
];

/// Label used when a series carries no usable key.
const DEFAULT_LABEL: &str = "series";

fn generic_data(tree: &Value) -> Option<&Value> {
    tree.get("GenericData")?.get("DataSet")?.get("Series")
}

fn compact_data(tree: &Value) -> Option<&Value> {
    tree.get("CompactData")?.get("DataSet")?.get("Series")
}

fn bare_dataset(tree: &Value) -> Option<&Value> {
    tree.get("DataSet")?.get("Series")
}

fn locate_series(tree: &Value) -> Result<(&'static str, &Value), DecodeError> {
    for (name, probe) in SHAPES {
        match probe(tree) {
            Some(series) => return Ok((*name, series)),
            None => log::debug!("layout {name} not present"),
        }
    }
    Err(DecodeError::UnrecognizedShape {
        tried: SHAPES
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Decode an XML-derived tree (explicit key/value records per series).
///
/// The row index is the sorted union of every period seen in any series; the
/// decoder does not rely on declared dimension lists. Series or observations
/// with missing fields are skipped rather than reported. The only error is
/// [`DecodeError::UnrecognizedShape`], when no layout in [`SHAPES`] matches.
///
/// Series that resolve to the same label are merged into one column, later
/// observations overwriting earlier ones for the same period.
pub fn decode_fallback(tree: &Value) -> Result<Table, DecodeError> {
    let (shape, series) = locate_series(tree)?;
    log::debug!("series container found via {shape}");

    let mut order: Vec<String> = Vec::new();
    let mut columns: HashMap<String, BTreeMap<String, Cell>> = HashMap::new();
    let mut periods: BTreeSet<String> = BTreeSet::new();

    for record in as_records(series) {
        if !record.is_object() {
            log::warn!("skipping series record that is not an element: {record}");
            continue;
        }
        let column = match columns.entry(series_label(record)) {
            Entry::Occupied(e) => {
                log::warn!("duplicate series label '{}', merging", e.key());
                e.into_mut()
            }
            Entry::Vacant(e) => {
                order.push(e.key().clone());
                e.insert(BTreeMap::new())
            }
        };

        for obs in record.get("Obs").map(as_records).unwrap_or_default() {
            let Some(period) = obs_period(obs) else {
                continue;
            };
            let value = obs_value(obs).map(Cell::coerce).unwrap_or_default();
            periods.insert(period.clone());
            column.insert(period, value);
        }
    }

    warn_on_mixed_formats(&periods);

    let mut table = Table::new(periods.into_iter().collect());
    for label in order {
        let cells = columns.remove(&label).unwrap_or_default();
        let values: Vec<Cell> = table
            .periods
            .iter()
            .map(|p| cells.get(p).cloned().unwrap_or_default())
            .collect();
        table.push_column(label, values);
    }
    Ok(table)
}

fn series_label(series: &Value) -> String {
    match series.get("SeriesKey").and_then(|k| k.get("Value")) {
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| attr_str(v, "@value").unwrap_or_default())
            .collect::<Vec<_>>()
            .join(LABEL_SEPARATOR),
        Some(single) => attr_str(single, "@value")
            .unwrap_or(DEFAULT_LABEL)
            .to_string(),
        None => compact_label(series).unwrap_or_else(|| DEFAULT_LABEL.to_string()),
    }
}

/// Compact-data series carry their key as attributes on the `Series` element.
fn compact_label(series: &Value) -> Option<String> {
    let parts: Vec<&str> = series
        .as_object()?
        .iter()
        .filter(|(k, _)| k.starts_with('@') && k.as_str() != "@TIME_FORMAT")
        .filter_map(|(_, v)| v.as_str())
        .collect();
    (!parts.is_empty()).then(|| parts.join(LABEL_SEPARATOR))
}

fn attr_str<'a>(v: &'a Value, name: &str) -> Option<&'a str> {
    v.get(name).and_then(Value::as_str)
}

/// `null` and `""` count as absent.
fn present(v: &Value) -> Option<&Value> {
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other),
    }
}

/// Element text: either the bare string of an attribute-less element or its `#text`.
fn element_text(v: &Value) -> Option<&Value> {
    match v {
        Value::Object(_) => v.get("#text").and_then(present),
        other => present(other),
    }
}

fn obs_period(obs: &Value) -> Option<String> {
    let v = obs
        .get("ObsDimension")
        .and_then(|d| d.get("@value"))
        .and_then(present)
        .or_else(|| obs.get("Time").and_then(element_text))
        .or_else(|| obs.get("@TIME_PERIOD").and_then(present))?;
    Some(match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn obs_value(obs: &Value) -> Option<&Value> {
    let value = obs.get("ObsValue");
    value
        .and_then(|v| v.get("@value"))
        .and_then(present)
        .or_else(|| value.and_then(element_text))
        .or_else(|| obs.get("@OBS_VALUE").and_then(present))
}

fn warn_on_mixed_formats(periods: &BTreeSet<String>) {
    let formats: BTreeSet<PeriodFormat> = periods.iter().map(|p| PeriodFormat::of(p)).collect();
    if formats.len() > 1 {
        log::warn!(
            "series report periods in mixed formats {formats:?}; rows are a plain sorted union and may not align"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes_are_probed_in_declared_order() {
        let names: Vec<&str> = SHAPES.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "GenericData/DataSet/Series",
                "CompactData/DataSet/Series",
                "DataSet/Series"
            ]
        );
    }

    #[test]
    fn label_from_key_value_list() {
        let s = json!({"SeriesKey": {"Value": [
            {"@concept": "LOCATION", "@value": "USA"},
            {"@concept": "SUBJECT"},
            {"@concept": "FREQ", "@value": "Q"}
        ]}});
        assert_eq!(series_label(&s), "USA..Q");
    }

    #[test]
    fn label_from_single_value_and_defaults() {
        let single = json!({"SeriesKey": {"Value": {"@value": "JPN"}}});
        assert_eq!(series_label(&single), "JPN");
        let no_value = json!({"SeriesKey": {"Value": {"@concept": "X"}}});
        assert_eq!(series_label(&no_value), "series");
        assert_eq!(series_label(&json!({"Obs": []})), "series");
    }

    #[test]
    fn label_from_compact_attributes() {
        let s = json!({"@LOCATION": "AUS", "@SUBJECT": "IRLT", "@TIME_FORMAT": "P1M", "Obs": []});
        assert_eq!(series_label(&s), "AUS.IRLT");
    }

    #[test]
    fn obs_fields_follow_priority() {
        let o = json!({"ObsDimension": {"@value": "2020-Q1"}, "Time": "2019", "ObsValue": {"@value": "1.5"}});
        assert_eq!(obs_period(&o).as_deref(), Some("2020-Q1"));
        assert_eq!(obs_value(&o), Some(&json!("1.5")));

        let o = json!({"Time": {"#text": "2021"}, "ObsValue": {"#text": "2"}});
        assert_eq!(obs_period(&o).as_deref(), Some("2021"));
        assert_eq!(obs_value(&o), Some(&json!("2")));

        let o = json!({"@TIME_PERIOD": "2022-01", "@OBS_VALUE": "3"});
        assert_eq!(obs_period(&o).as_deref(), Some("2022-01"));
        assert_eq!(obs_value(&o), Some(&json!("3")));

        assert_eq!(obs_period(&json!({"ObsValue": {"@value": "1"}})), None);
        assert_eq!(obs_value(&json!({"Time": "2020"})), None);
    }
}
