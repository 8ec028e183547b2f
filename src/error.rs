use thiserror::Error;

/// Errors raised while turning an SDMX tree into a [`Table`](crate::models::Table).
///
/// The strict decoder reports every structural problem with a specific kind.
/// Value-level coercion never fails: unparsable observations are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A required container (dimension metadata, `dataSets[0].series`, ...) is missing
    /// or has the wrong JSON type.
    #[error("malformed SDMX structure: {0}")]
    MalformedStructure(String),

    /// `structure.dimensions.observation[0].values` is absent or empty.
    #[error("observation dimension is missing or declares no values")]
    MissingObservationDimension,

    /// A series key has a different number of components than there are series dimensions.
    #[error("series key '{key}' has {found} components, expected {expected}")]
    KeyArityMismatch {
        key: String,
        expected: usize,
        found: usize,
    },

    /// A series key component points past the end of its dimension's value list.
    #[error(
        "series key '{key}': position {position} out of range for dimension {dimension} ({len} values)"
    )]
    DimensionIndexOutOfRange {
        key: String,
        dimension: usize,
        position: usize,
        len: usize,
    },

    /// An observation key is not an integer or exceeds the number of periods.
    #[error("series '{series}': invalid observation index '{index}' ({rows} periods)")]
    InvalidRowIndex {
        series: String,
        index: String,
        rows: usize,
    },

    /// None of the known alternate layouts contained a series container.
    #[error("no series container found (tried: {tried})")]
    UnrecognizedShape { tried: String },
}

/// Errors from the XML-to-tree normalizer.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml parse error at byte {position}: {source}")]
    Parse {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("invalid xml attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("invalid character data: {0}")]
    Text(#[source] quick_xml::Error),

    #[error("unexpected closing tag '{0}'")]
    UnbalancedTag(String),

    #[error("element '{0}' is never closed")]
    Unclosed(String),

    #[error("document has no root element")]
    Empty,
}
