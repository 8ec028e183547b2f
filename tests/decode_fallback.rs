use oecd_rs::models::Cell;
use oecd_rs::{DecodeError, decode_any, decode_fallback, xml};
use serde_json::json;

const GENERIC_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<message:GenericData xmlns:message="http://www.SDMX.org/resources/SDMXML/schemas/v2_0/message"
                     xmlns="http://www.SDMX.org/resources/SDMXML/schemas/v2_0/generic">
  <message:Header><message:ID>none</message:ID></message:Header>
  <message:DataSet>
    <KeyFamilyRef>QNA</KeyFamilyRef>
    <Series>
      <SeriesKey>
        <Value concept="LOCATION" value="USA" />
        <Value concept="SUBJECT" value="B1_GE" />
        <Value concept="FREQUENCY" value="Q" />
      </SeriesKey>
      <Obs><Time>2022-Q2</Time><ObsValue value="101.2" /></Obs>
      <Obs><Time>2022-Q1</Time><ObsValue value="100.5" /></Obs>
    </Series>
    <Series>
      <SeriesKey>
        <Value concept="LOCATION" value="CAN" />
        <Value concept="SUBJECT" value="B1_GE" />
        <Value concept="FREQUENCY" value="Q" />
      </SeriesKey>
      <Obs><Time>2021-Q4</Time><ObsValue value="89.1" /></Obs>
      <Obs><Time>2022-Q1</Time><ObsValue value="p" /></Obs>
    </Series>
  </message:DataSet>
</message:GenericData>"#;

#[test]
fn generic_data_document_end_to_end() {
    let tree = xml::to_tree(GENERIC_XML).unwrap();
    let t = decode_any(&tree).unwrap();
    assert_eq!(t.periods, vec!["2021-Q4", "2022-Q1", "2022-Q2"]);
    assert_eq!(
        t.labels().collect::<Vec<_>>(),
        vec!["USA.B1_GE.Q", "CAN.B1_GE.Q"]
    );
    assert_eq!(t.get("2021-Q4", "USA.B1_GE.Q"), Some(&Cell::Missing));
    assert_eq!(t.get("2022-Q2", "USA.B1_GE.Q"), Some(&Cell::Number(101.2)));
    assert_eq!(t.get("2021-Q4", "CAN.B1_GE.Q"), Some(&Cell::Number(89.1)));
    assert_eq!(t.get("2022-Q1", "CAN.B1_GE.Q"), Some(&Cell::Text("p".into())));
}

#[test]
fn compact_data_document_end_to_end() {
    let doc = r#"<CompactData xmlns="urn:sdmx:message">
      <DataSet>
        <Series LOCATION="AUS" SUBJECT="IRLT" TIME_FORMAT="P1M">
          <Obs TIME_PERIOD="2020-01" OBS_VALUE="1.01" />
          <Obs TIME_PERIOD="2020-02" OBS_VALUE="0.95" />
        </Series>
      </DataSet>
    </CompactData>"#;
    let t = decode_fallback(&xml::to_tree(doc).unwrap()).unwrap();
    assert_eq!(t.labels().collect::<Vec<_>>(), vec!["AUS.IRLT"]);
    assert_eq!(t.periods, vec!["2020-01", "2020-02"]);
    assert_eq!(t.get("2020-02", "AUS.IRLT"), Some(&Cell::Number(0.95)));
}

#[test]
fn third_shape_is_found_after_first_two_miss() {
    let tree = json!({"DataSet": {"Series": [
        {"SeriesKey": {"Value": [{"@value": "JPN"}, {"@value": "CPI"}]},
         "Obs": [{"ObsDimension": {"@value": "2020"}, "ObsValue": {"@value": "0.1"}}]}
    ]}});
    let t = decode_fallback(&tree).unwrap();
    assert_eq!(t.get("2020", "JPN.CPI"), Some(&Cell::Number(0.1)));
}

#[test]
fn no_known_shape_is_unrecognized() {
    let tree = json!({"message": {"dataSets": []}});
    match decode_fallback(&tree) {
        Err(DecodeError::UnrecognizedShape { tried }) => {
            assert!(tried.contains("GenericData"));
            assert!(tried.contains("CompactData"));
        }
        other => panic!("expected UnrecognizedShape, got {other:?}"),
    }
}

#[test]
fn single_series_and_single_obs_are_normalized() {
    let tree = json!({"GenericData": {"DataSet": {"Series": {
        "SeriesKey": {"Value": {"@concept": "LOCATION", "@value": "GBR"}},
        "Obs": {"Time": {"#text": "2023-05"}, "ObsValue": {"#text": "4.2"}}
    }}}});
    let t = decode_fallback(&tree).unwrap();
    assert_eq!(t.n_cols(), 1);
    assert_eq!(t.get("2023-05", "GBR"), Some(&Cell::Number(4.2)));
}

#[test]
fn missing_fields_degrade_to_omission() {
    let tree = json!({"DataSet": {"Series": [
        {"SeriesKey": {"Value": [{"@value": "A"}]},
         "Obs": [
            {"ObsValue": {"@value": "1"}},
            {"Time": "2020"},
            {"Time": "2021", "ObsValue": {"@value": "2"}}
         ]},
        {"SeriesKey": {"Value": [{"@value": "B"}]}}
    ]}});
    let t = decode_fallback(&tree).unwrap();
    assert_eq!(t.periods, vec!["2020", "2021"]);
    assert_eq!(t.get("2020", "A"), Some(&Cell::Missing));
    assert_eq!(t.get("2021", "A"), Some(&Cell::Number(2.0)));
    // A series without observations still gets an all-missing column.
    assert!(t.column("B").unwrap().values.iter().all(Cell::is_missing));
}

#[test]
fn duplicate_labels_merge_into_one_column() {
    let tree = json!({"DataSet": {"Series": [
        {"SeriesKey": {"Value": [{"@value": "X"}]},
         "Obs": [{"Time": "2020", "ObsValue": {"@value": "1"}},
                 {"Time": "2021", "ObsValue": {"@value": "2"}}]},
        {"SeriesKey": {"Value": [{"@value": "X"}]},
         "Obs": [{"Time": "2021", "ObsValue": {"@value": "3"}}]}
    ]}});
    let t = decode_fallback(&tree).unwrap();
    assert_eq!(t.n_cols(), 1);
    assert_eq!(t.get("2020", "X"), Some(&Cell::Number(1.0)));
    assert_eq!(t.get("2021", "X"), Some(&Cell::Number(3.0)));
}

#[test]
fn empty_series_container_gives_empty_table() {
    let tree = xml::to_tree("<DataSet><Series/></DataSet>").unwrap();
    let t = decode_fallback(&tree).unwrap();
    assert!(t.is_empty());
    assert_eq!(t.n_rows(), 0);
}
