//! oecd_rs
//!
//! A lightweight Rust library for retrieving OECD statistics over the SDMX REST
//! API and reshaping them into period-indexed tables. Pairs with the `oecd` CLI.
//!
//! ### Features
//! - Fetch datasets as SDMX-JSON or SDMX-ML (XML normalized into a JSON tree)
//! - Decode index-compressed SDMX-JSON into a dense table (rows = periods,
//!   columns = series such as `USA.B1_GE`)
//! - Fallback decoding of XML-derived trees across the generic, compact and bare
//!   dataset layouts
//! - Filter by column substring and inclusive period range
//! - Save as CSV or JSON; keep raw trees for offline querying
//!
//! ### Example
//! ```no_run
//! use oecd_rs::{Client, PeriodSpec, query};
//! use oecd_rs::api::SdmxFormat;
//!
//! let client = Client::default();
//! let table = client.fetch_table(
//!     "QNA",
//!     "Q..USA+CAN+JPN.B1_GE.CQRSA",
//!     Some(&PeriodSpec::new("2000-Q1", "2025-Q3")),
//!     SdmxFormat::Json,
//! )?;
//! let usa = query::select_columns(&table, "USA");
//! let recent = query::select_period_range(&usa, Some("2022-Q1"), Some("2024-Q4"));
//! oecd_rs::storage::save_csv(&recent, "usa_gdp.csv")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod config;
pub mod decode;
pub mod error;
pub mod models;
pub mod query;
pub mod stats;
pub mod storage;
pub mod xml;

pub use api::Client;
pub use decode::{decode, decode_any, decode_fallback};
pub use error::DecodeError;
pub use models::{Cell, PeriodSpec, Table};
