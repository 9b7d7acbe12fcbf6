pub mod converter;
mod decoder;
pub mod element;
pub mod encoding;
pub mod error;
pub mod gpx_types;
pub mod markup;
pub mod options;
pub mod stats;
pub mod types;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use crate::converter::{LineShape, TrackShape, WaypointShape, to_geojson_with};
pub use crate::element::Element;
pub use crate::error::{GpxError, Result};
pub use crate::gpx_types::*;
pub use crate::markup::GpxElement;
pub use crate::options::{CollectionKind, ConvertOptions, GpxElementType};
pub use crate::stats::{PointSequence, Positioned, TrackSummary};
pub use crate::types::{Decimal, Degrees, DgpsStation, Fix, Latitude, Longitude};

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let gpx: Gpx = gpx_string.parse()?;
    to_js(&to_geojson_with(&gpx, &opts))
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(
    gpx_string: &str,
    options: JsValue,
) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let gpx: Gpx = gpx_string.parse()?;
    serde_json::to_string(&to_geojson_with(&gpx, &opts))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert a GeoJSON FeatureCollection or GeometryCollection (JS object) to a
/// GPX string.
#[wasm_bindgen(js_name = geoJsonToGpx)]
pub fn geojson_to_gpx(geojson: JsValue) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let value: serde_json::Value =
        serde_wasm_bindgen::from_value(geojson).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let gpx = Gpx::from_geojson(&value)?;
    Ok(gpx.to_xml_string()?)
}

/// Aggregate statistics for every track of a GPX string, as a JS array.
#[wasm_bindgen(js_name = gpxTrackSummaries)]
pub fn gpx_track_summaries(gpx_string: &str) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let gpx: Gpx = gpx_string.parse()?;
    let summaries: Vec<TrackSummary> = gpx.tracks.iter().map(Track::summary).collect();
    to_js(&summaries)
}

fn parse_options(options: JsValue) -> std::result::Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Serialize maps as plain JS objects rather than `Map`s.
fn to_js<T: Serialize + ?Sized>(value: &T) -> std::result::Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
