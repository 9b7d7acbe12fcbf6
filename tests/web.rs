#![cfg(target_arch = "wasm32")]

use gpx_geojson::{geojson_to_gpx, gpx_to_geojson, gpx_to_geojson_string, gpx_track_summaries};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

const TRACK: &str = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="web" xmlns="http://www.topografix.com/GPX/1/1">
  <wpt lat="35.0" lon="139.0"><name>Start</name></wpt>
  <trk>
    <name>Run</name>
    <trkseg>
      <trkpt lat="0.0" lon="0.0"><ele>10</ele><time>2025-01-01T06:00:00Z</time></trkpt>
      <trkpt lat="0.0" lon="0.001"><ele>12</ele><time>2025-01-01T06:00:10Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

#[wasm_bindgen_test]
fn geojson_string_export() {
    let text = gpx_to_geojson_string(TRACK, JsValue::UNDEFINED).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["features"].as_array().unwrap().len(), 2);
}

#[wasm_bindgen_test]
fn geojson_object_round_trips_to_gpx() {
    let object = gpx_to_geojson(TRACK, JsValue::NULL).unwrap();
    let xml = geojson_to_gpx(object).unwrap();
    assert!(xml.contains("<trkpt"));
    assert!(xml.contains("<name>Start</name>"));
}

#[wasm_bindgen_test]
fn invalid_gpx_is_rejected() {
    assert!(gpx_to_geojson_string("<gpx><wpt lat=\"x\" lon=\"0\"/></gpx>", JsValue::UNDEFINED).is_err());
}

#[wasm_bindgen_test]
fn track_summaries_export() {
    let summaries = gpx_track_summaries(TRACK).unwrap();
    let summaries: Vec<serde_json::Value> = serde_wasm_bindgen::from_value(summaries).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0]["name"], "Run");
    assert_eq!(summaries[0]["totalAscent"], 2.0);
}
