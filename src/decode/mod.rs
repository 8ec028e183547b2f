//! SDMX tree → [`Table`] decoders.
//!
//! Two decoders cover the two shapes the OECD endpoints produce:
//!
//! - [`decode`]: the native SDMX-JSON layout, where series are keyed by
//!   index-compressed keys (`"0:3:1"`) and dimension labels live in
//!   `structure.dimensions`. Strict: structural problems are errors.
//! - [`decode_fallback`]: trees normalized from SDMX-ML (see [`crate::xml`]),
//!   where each series carries explicit key/value records. Lenient: probes a
//!   fixed list of known layouts and degrades missing fields to omission.
//!
//! [`decode_any`] picks one based on the tree's top-level keys.
//!
//! ```
//! use oecd_rs::decode::decode;
//! use serde_json::json;
//!
//! let tree = json!({
//!     "structure": {"dimensions": {
//!         "observation": [{"values": [{"id": "2022-Q1"}]}],
//!         "series": [{"values": [{"id": "USA"}]}]
//!     }},
//!     "dataSets": [{"series": {"0": {"observations": {"0": [100.5]}}}}]
//! });
//! let table = decode(&tree)?;
//! assert_eq!(table.get("2022-Q1", "USA").and_then(|c| c.as_f64()), Some(100.5));
//! # Ok::<(), oecd_rs::error::DecodeError>(())
//! ```

mod fallback;
mod indexed;

pub use fallback::{SHAPES, ShapeProbe, decode_fallback};
pub use indexed::decode;

use crate::error::DecodeError;
use crate::models::Table;
use serde_json::Value;

/// Separator between per-dimension positions in an index-compressed series key.
pub const KEY_SEPARATOR: char = ':';
/// Separator between resolved dimension ids in a column label.
pub const LABEL_SEPARATOR: &str = ".";

/// Decode any supported tree: SDMX-JSON (top-level `dataSets`, optionally inside a
/// `data` envelope) goes through the strict decoder, everything else through the
/// fallback decoder.
pub fn decode_any(tree: &Value) -> Result<Table, DecodeError> {
    if is_sdmx_json(tree) {
        log::debug!("decoding index-compressed SDMX-JSON tree");
        decode(tree)
    } else {
        log::debug!("decoding tree through fallback layouts");
        decode_fallback(tree)
    }
}

fn is_sdmx_json(tree: &Value) -> bool {
    tree.get("dataSets").is_some()
        || tree
            .get("data")
            .is_some_and(|d| d.get("dataSets").is_some())
}

/// Normalize "one record or a list of records" into a list.
///
/// `null` (an empty XML element) becomes an empty list.
pub(crate) fn as_records(v: &Value) -> Vec<&Value> {
    match v {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
