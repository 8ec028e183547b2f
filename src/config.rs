use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// SDMX-JSON REST endpoint (current OECD data explorer API).
pub const DEFAULT_JSON_BASE_URL: &str = "https://sdmx.oecd.org/public/rest/data";
/// Legacy SDMX-ML endpoint (`GetData`), used by the batch updater.
pub const DEFAULT_XML_BASE_URL: &str = "https://stats.oecd.org/restsdmx/sdmx.ashx/GetData";
/// Where `update` writes raw trees unless told otherwise.
pub const DEFAULT_DATA_DIR: &str = "data";
/// Total request timeout, shared by [`ClientConfig::default`] and the CLI.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for [`crate::api::Client`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub json_base_url: String,
    pub xml_base_url: String,
    /// Total request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            json_base_url: DEFAULT_JSON_BASE_URL.into(),
            xml_base_url: DEFAULT_XML_BASE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// One entry of the batch download list.
///
/// `name` doubles as the output file stem, so it must be unique within a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    pub dataset_code: String,
    pub query: String,
}

impl DatasetSpec {
    pub fn new(name: &str, dataset_code: &str, query: &str) -> Self {
        Self {
            name: name.into(),
            dataset_code: dataset_code.into(),
            query: query.into(),
        }
    }
}

/// Built-in batch list used when no `--datasets` file is given.
pub fn default_datasets() -> Vec<DatasetSpec> {
    vec![
        // United States, GDP, quarterly
        DatasetSpec::new("USA_GDP_QUARTERLY", "QNA", "USA.B1_GE.CPCARSA.Q"),
        // Japan, CPI, year-on-year growth, monthly
        DatasetSpec::new("JPN_INFLATION_YOY", "KEI", "JPN.CPI.TOT.IXOB.GY.M"),
        // Euro area, 3-month interest rate, monthly
        DatasetSpec::new("EURO_AREA_3M_INTEREST_RATE", "MEI_FIN", "EA.IR3T.M"),
        // United Kingdom, unemployment rate, seasonally adjusted, monthly
        DatasetSpec::new("UK_UNEMPLOYMENT_RATE", "KEI", "GBR.LR.LREM64TT.STSA.M"),
        // Australia, long-term interest rate, monthly
        DatasetSpec::new("AUS_LONG_INTEREST_RATE", "MEI_FIN", "AUS.IRLT.M"),
    ]
}

/// Load a batch list from a JSON array of `{name, dataset_code, query}` objects.
pub fn load_datasets<P: AsRef<Path>>(path: P) -> Result<Vec<DatasetSpec>> {
    let path = path.as_ref();
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("read dataset list {}", path.display()))?;
    let specs: Vec<DatasetSpec> = serde_json::from_str(&txt)
        .with_context(|| format!("parse dataset list {}", path.display()))?;
    validate_datasets(&specs)?;
    Ok(specs)
}

/// Reject empty lists, blank fields and duplicate names.
pub fn validate_datasets(specs: &[DatasetSpec]) -> Result<()> {
    if specs.is_empty() {
        bail!("dataset list is empty");
    }
    let mut seen = BTreeSet::new();
    for s in specs {
        if s.name.trim().is_empty() || s.dataset_code.trim().is_empty() {
            bail!("dataset entry with empty name or dataset_code: {:?}", s);
        }
        if !seen.insert(s.name.as_str()) {
            bail!("duplicate dataset name: {}", s.name);
        }
    }
    Ok(())
}
