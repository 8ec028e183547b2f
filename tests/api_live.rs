//! Live API tests. Run with: `cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use oecd_rs::api::SdmxFormat;
use oecd_rs::{Client, PeriodSpec, query};

#[test]
fn fetch_small_range_as_json() {
    let cli = Client::default();
    let t = cli
        .fetch_table(
            "QNA",
            "Q..USA+CAN.B1_GE.CQRSA",
            Some(&PeriodSpec::new("2022-Q1", "2022-Q4")),
            SdmxFormat::Json,
        )
        .unwrap();
    assert!(!t.is_empty());
    assert!(t.periods.iter().all(|p| p.as_str() >= "2022-Q1" && p.as_str() <= "2022-Q4"));
    assert!(query::select_columns(&t, "USA").n_cols() >= 1);
}

#[test]
fn fetch_legacy_xml_tree() {
    let cli = Client::default();
    let tree = cli
        .fetch_tree("QNA", "USA.B1_GE.CPCARSA.Q", None, SdmxFormat::Xml)
        .unwrap();
    let t = oecd_rs::decode_any(&tree).unwrap();
    assert!(t.labels().any(|l| l.contains("USA")));
}
