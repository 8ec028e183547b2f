//! Synchronous client for the **OECD SDMX REST API**.
//!
//! Two endpoints are supported:
//! - the SDMX-JSON data API (`contentType=json`), decoded by [`crate::decode::decode`];
//! - the legacy SDMX-ML `GetData` endpoint (`contentType=xml`), normalized with
//!   [`crate::xml::to_tree`] and decoded by [`crate::decode::decode_fallback`].
//!
//! ### Notes
//! - Dataset codes and series keys keep `.`, `+`, `-` and `_` unescaped, since SDMX
//!   keys use `.` between dimensions and `+` between alternatives (`USA+CAN`).
//! - Transient failures (5xx, network errors) are retried three times with a short backoff.
//!
//! Typical usage:
//! ```no_run
//! # use oecd_rs::{Client, PeriodSpec};
//! # use oecd_rs::api::SdmxFormat;
//! let client = Client::default();
//! let table = client.fetch_table(
//!     "QNA",
//!     "Q..USA+CAN.B1_GE.CQRSA",
//!     Some(&PeriodSpec::new("2020-Q1", "2022-Q4")),
//!     SdmxFormat::Json,
//! )?;
//! println!("{table}");
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::ClientConfig;
use crate::decode::decode_any;
use crate::models::{PeriodSpec, Table};
use crate::xml;
use anyhow::{Context, Result, bail};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::redirect::Policy;
use serde_json::Value;
use std::time::Duration;

/// Which representation to request from the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SdmxFormat {
    #[default]
    Json,
    Xml,
}

#[derive(Debug, Clone)]
pub struct Client {
    pub json_base_url: String,
    pub xml_base_url: String,
    http: HttpClient,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(&ClientConfig::default()).expect("reqwest client build")
    }
}

// Allow -, _, ., + unescaped in dataset codes and series keys
const SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'+');

fn enc(part: &str) -> String {
    percent_encoding::utf8_percent_encode(part.trim(), SAFE).to_string()
}

fn with_params(mut url: String, params: &[(&str, &str)]) -> String {
    for (i, (k, v)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(k);
        url.push('=');
        url.push_str(&enc(v));
    }
    url
}

/// First few hundred characters of an error body, for messages.
fn excerpt(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(300)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    body[..end].trim()
}

impl Client {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout) // total request timeout
            .connect_timeout(cfg.connect_timeout)
            .redirect(Policy::limited(5)) // cap redirects
            .user_agent(concat!("oecd_rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            json_base_url: cfg.json_base_url.trim_end_matches('/').to_string(),
            xml_base_url: cfg.xml_base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// SDMX-JSON data URL: `{base}/{dataset}/{key}/all?startTime=..&endTime=..&contentType=json`.
    pub fn data_url(&self, dataset: &str, query: &str, period: Option<&PeriodSpec>) -> String {
        let mut params = period.map(PeriodSpec::to_query_params).unwrap_or_default();
        params.push(("contentType", "json"));
        with_params(
            format!("{}/{}/{}/all", self.json_base_url, enc(dataset), enc(query)),
            &params,
        )
    }

    /// Legacy SDMX-ML URL: `{base}/{dataset}/{key}?startTime=..&endTime=..&contentType=xml`.
    pub fn legacy_url(&self, dataset: &str, query: &str, period: Option<&PeriodSpec>) -> String {
        let mut params = period.map(PeriodSpec::to_query_params).unwrap_or_default();
        params.push(("contentType", "xml"));
        with_params(
            format!("{}/{}/{}", self.xml_base_url, enc(dataset), enc(query)),
            &params,
        )
    }

    /// GET with a small retry for transient failures (5xx / network errors).
    fn get(&self, url: &str) -> Result<Response> {
        let mut last_err = anyhow::anyhow!("no request sent");
        for (attempt, backoff_ms) in [100u64, 300, 700].into_iter().enumerate() {
            if attempt > 0 {
                std::thread::sleep(Duration::from_millis(backoff_ms));
            }
            log::info!("GET {url}");
            match self.http.get(url).send() {
                Ok(r) if r.status().is_success() => return Ok(r),
                Ok(r) if r.status().is_server_error() => {
                    log::warn!("HTTP {} from {url}, retrying", r.status());
                    last_err = anyhow::anyhow!("HTTP {}", r.status());
                }
                Ok(r) => {
                    let status = r.status();
                    let body = r.text().unwrap_or_default();
                    bail!("request failed with HTTP {}: {}", status, excerpt(&body));
                }
                Err(e) => last_err = e.into(),
            }
        }
        bail!("giving up after 3 attempts: {:#}", last_err);
    }

    /// Fetch a dataset as native SDMX-JSON.
    pub fn fetch_json(&self, dataset: &str, query: &str, period: Option<&PeriodSpec>) -> Result<Value> {
        let url = self.data_url(dataset, query, period);
        self.get(&url)
            .and_then(|r| r.json::<Value>().context("decode json"))
            .with_context(|| format!("GET {}", url))
    }

    /// Fetch a dataset as SDMX-ML and normalize it into a JSON tree.
    pub fn fetch_xml(&self, dataset: &str, query: &str, period: Option<&PeriodSpec>) -> Result<Value> {
        let url = self.legacy_url(dataset, query, period);
        let body = self
            .get(&url)
            .and_then(|r| r.text().context("read body"))
            .with_context(|| format!("GET {}", url))?;
        xml::to_tree(&body).with_context(|| format!("parse xml from {}", url))
    }

    /// Fetch the raw tree in the requested representation.
    pub fn fetch_tree(
        &self,
        dataset: &str,
        query: &str,
        period: Option<&PeriodSpec>,
        format: SdmxFormat,
    ) -> Result<Value> {
        if dataset.trim().is_empty() {
            bail!("dataset code required");
        }
        match format {
            SdmxFormat::Json => self.fetch_json(dataset, query, period),
            SdmxFormat::Xml => self.fetch_xml(dataset, query, period),
        }
    }

    /// Fetch and decode into a period-indexed table.
    pub fn fetch_table(
        &self,
        dataset: &str,
        query: &str,
        period: Option<&PeriodSpec>,
        format: SdmxFormat,
    ) -> Result<Table> {
        let tree = self.fetch_tree(dataset, query, period, format)?;
        decode_any(&tree).with_context(|| format!("decode {dataset}/{query}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_keeps_sdmx_key_syntax() {
        let c = Client::default();
        let url = c.data_url(
            "QNA",
            "Q..USA+CAN.B1_GE.CQRSA",
            Some(&PeriodSpec::new("2000-Q1", "2025-Q3")),
        );
        assert_eq!(
            url,
            "https://sdmx.oecd.org/public/rest/data/QNA/Q..USA+CAN.B1_GE.CQRSA/all\
             ?startTime=2000-Q1&endTime=2025-Q3&contentType=json"
        );
    }

    #[test]
    fn legacy_url_without_period() {
        let c = Client::default();
        assert_eq!(
            c.legacy_url("KEI", "JPN.CPI.TOT.IXOB.GY.M", None),
            "https://stats.oecd.org/restsdmx/sdmx.ashx/GetData/KEI/JPN.CPI.TOT.IXOB.GY.M?contentType=xml"
        );
    }

    #[test]
    fn blank_dataset_code_is_rejected_offline() {
        // Closed local port: a request that slipped through would fail with a network error.
        let c = Client::new(&ClientConfig {
            json_base_url: "http://127.0.0.1:9".into(),
            xml_base_url: "http://127.0.0.1:9".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        for format in [SdmxFormat::Json, SdmxFormat::Xml] {
            let err = c.fetch_tree("  ", "x", None, format).unwrap_err();
            assert_eq!(err.to_string(), "dataset code required");
        }
    }

    #[test]
    fn exhausted_retries_report_last_error() {
        let c = Client::new(&ClientConfig {
            json_base_url: "http://127.0.0.1:9".into(),
            ..ClientConfig::default()
        })
        .unwrap();
        let err = c.fetch_json("QNA", "all", None).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("giving up after 3 attempts"), "{msg}");
        assert!(!msg.contains("Some("), "{msg}");
    }

    #[test]
    fn unsafe_characters_are_escaped() {
        assert_eq!(enc(" a/b c "), "a%2Fb%20c");
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(1000);
        assert_eq!(excerpt(&long).len(), 300);
        assert_eq!(excerpt(" short "), "short");
    }
}
