use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use log::{debug, trace};
use serde_json::Value as JsonValue;

use crate::encoding::{json_to_decimal, parse_datetime};
use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::types::{Decimal, Degrees, DgpsStation, Fix, Latitude, Longitude};

const PROPERTIES: &str = "properties";

impl Waypoint {
    /// Read a `Point` or a `Feature` with a `Point` geometry.
    pub fn from_geojson(value: &JsonValue) -> Result<Self> {
        const EXPECTED: &str = "Point or Feature";
        accept(value, &["Point", "Feature"], EXPECTED)?;
        match GeoJson::from_json_value(value.clone())? {
            GeoJson::Geometry(geometry) => waypoint_from_geometry(&geometry, EXPECTED),
            GeoJson::Feature(feature) => waypoint_from_feature(&feature, EXPECTED),
            other => Err(unsupported(&other, EXPECTED)),
        }
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        Self::from_geojson(&parse_json(text)?)
    }
}

impl Route {
    /// Read a `LineString` or a `Feature` with a `LineString` geometry.
    pub fn from_geojson(value: &JsonValue) -> Result<Self> {
        const EXPECTED: &str = "LineString or Feature";
        accept(value, &["LineString", "Feature"], EXPECTED)?;
        match GeoJson::from_json_value(value.clone())? {
            GeoJson::Geometry(geometry) => Ok(Route {
                points: line_points(&geometry, EXPECTED)?,
                ..Route::default()
            }),
            GeoJson::Feature(feature) => route_from_feature(&feature, EXPECTED),
            other => Err(unsupported(&other, EXPECTED)),
        }
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        Self::from_geojson(&parse_json(text)?)
    }
}

impl TrackSegment {
    /// Read a `LineString` or a `Feature` with a `LineString` geometry.
    pub fn from_geojson(value: &JsonValue) -> Result<Self> {
        const EXPECTED: &str = "LineString or Feature";
        accept(value, &["LineString", "Feature"], EXPECTED)?;
        let points = match GeoJson::from_json_value(value.clone())? {
            GeoJson::Geometry(geometry) => line_points(&geometry, EXPECTED)?,
            GeoJson::Feature(feature) => {
                let mut points = line_points(feature_geometry(&feature, EXPECTED)?, EXPECTED)?;
                if let Some(props) = &feature.properties {
                    zip_point_properties(&mut points, props.get("coordinatesProperties"))?;
                }
                points
            }
            other => return Err(unsupported(&other, EXPECTED)),
        };
        Ok(TrackSegment::new(points))
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        Self::from_geojson(&parse_json(text)?)
    }
}

impl Track {
    /// Read a `MultiLineString` or a `Feature` with a `MultiLineString`
    /// geometry. Each line becomes one segment.
    pub fn from_geojson(value: &JsonValue) -> Result<Self> {
        const EXPECTED: &str = "MultiLineString or Feature";
        accept(value, &["MultiLineString", "Feature"], EXPECTED)?;
        match GeoJson::from_json_value(value.clone())? {
            GeoJson::Geometry(geometry) => Ok(Track {
                segments: track_segments(&geometry, EXPECTED)?,
                ..Track::default()
            }),
            GeoJson::Feature(feature) => track_from_feature(&feature, EXPECTED),
            other => Err(unsupported(&other, EXPECTED)),
        }
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        Self::from_geojson(&parse_json(text)?)
    }
}

impl Gpx {
    /// Read a `FeatureCollection` or `GeometryCollection`. Members are sorted
    /// by geometry kind: points become waypoints, line strings routes and
    /// multi line strings tracks.
    pub fn from_geojson(value: &JsonValue) -> Result<Self> {
        const EXPECTED: &str = "FeatureCollection or GeometryCollection";
        const MEMBER: &str = "Point, LineString or MultiLineString";
        accept(value, &["FeatureCollection", "GeometryCollection"], EXPECTED)?;

        let mut gpx = Gpx::new();
        match GeoJson::from_json_value(value.clone())? {
            GeoJson::FeatureCollection(FeatureCollection { features, .. }) => {
                for feature in &features {
                    let geometry = feature_geometry(feature, MEMBER)?;
                    trace!("decoding {} feature", kind_name(&geometry.value));
                    match &geometry.value {
                        Value::Point(_) => gpx.waypoints.push(waypoint_from_feature(feature, MEMBER)?),
                        Value::LineString(_) => gpx.routes.push(route_from_feature(feature, MEMBER)?),
                        Value::MultiLineString(_) => {
                            gpx.tracks.push(track_from_feature(feature, MEMBER)?)
                        }
                        other => return Err(unsupported_value(other, MEMBER)),
                    }
                }
            }
            GeoJson::Geometry(Geometry {
                value: Value::GeometryCollection(geometries),
                ..
            }) => {
                for geometry in &geometries {
                    trace!("decoding {} geometry", kind_name(&geometry.value));
                    match &geometry.value {
                        Value::Point(_) => gpx.waypoints.push(waypoint_from_geometry(geometry, MEMBER)?),
                        Value::LineString(_) => gpx.routes.push(Route {
                            points: line_points(geometry, MEMBER)?,
                            ..Route::default()
                        }),
                        Value::MultiLineString(_) => gpx.tracks.push(Track {
                            segments: track_segments(geometry, MEMBER)?,
                            ..Track::default()
                        }),
                        other => return Err(unsupported_value(other, MEMBER)),
                    }
                }
            }
            other => return Err(unsupported(&other, EXPECTED)),
        }

        debug!(
            "decoded GeoJSON: {} waypoints, {} routes, {} tracks",
            gpx.waypoints.len(),
            gpx.routes.len(),
            gpx.tracks.len()
        );
        Ok(gpx)
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        Self::from_geojson(&parse_json(text)?)
    }
}

fn parse_json(text: &str) -> Result<JsonValue> {
    serde_json::from_str(text).map_err(|e| GpxError::InvalidGeoJson(e.to_string()))
}

/// Check the discriminator of a raw GeoJSON value against the accepted kinds.
fn accept(value: &JsonValue, accepted: &[&str], expected: &'static str) -> Result<()> {
    let object = value
        .as_object()
        .ok_or_else(|| GpxError::InvalidGeoJson("expected a JSON object".to_string()))?;
    let kind = object
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| GpxError::InvalidGeoJson("missing string member 'type'".to_string()))?;
    if accepted.contains(&kind) {
        Ok(())
    } else {
        Err(GpxError::UnsupportedGeoJsonType {
            found: kind.to_string(),
            expected,
        })
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn unsupported_value(value: &Value, expected: &'static str) -> GpxError {
    GpxError::UnsupportedGeoJsonType {
        found: kind_name(value).to_string(),
        expected,
    }
}

fn unsupported(geojson: &GeoJson, expected: &'static str) -> GpxError {
    let found = match geojson {
        GeoJson::Geometry(geometry) => kind_name(&geometry.value),
        GeoJson::Feature(_) => "Feature",
        GeoJson::FeatureCollection(_) => "FeatureCollection",
    };
    GpxError::UnsupportedGeoJsonType {
        found: found.to_string(),
        expected,
    }
}

fn feature_geometry<'a>(feature: &'a Feature, expected: &'static str) -> Result<&'a Geometry> {
    feature
        .geometry
        .as_ref()
        .ok_or_else(|| GpxError::UnsupportedGeoJsonType {
            found: "Feature without geometry".to_string(),
            expected,
        })
}

fn position(coords: &[f64]) -> Result<Waypoint> {
    match *coords {
        [lon, lat] => Ok(Waypoint::new(Latitude::new(lat)?, Longitude::new(lon)?)),
        [lon, lat, ele, ..] => Waypoint::new(Latitude::new(lat)?, Longitude::new(lon)?).with_ele(ele),
        _ => Err(GpxError::InvalidGeoJson(format!(
            "position needs at least two numbers, got {}",
            coords.len()
        ))),
    }
}

fn waypoint_from_geometry(geometry: &Geometry, expected: &'static str) -> Result<Waypoint> {
    match &geometry.value {
        Value::Point(coords) => position(coords),
        other => Err(unsupported_value(other, expected)),
    }
}

fn waypoint_from_feature(feature: &Feature, expected: &'static str) -> Result<Waypoint> {
    let mut wpt = waypoint_from_geometry(feature_geometry(feature, expected)?, expected)?;
    if let Some(props) = &feature.properties {
        apply_point_properties(&mut wpt, props)?;
    }
    Ok(wpt)
}

fn line_points(geometry: &Geometry, expected: &'static str) -> Result<Vec<Waypoint>> {
    match &geometry.value {
        Value::LineString(line) => line.iter().map(|coords| position(coords)).collect(),
        other => Err(unsupported_value(other, expected)),
    }
}

fn track_segments(geometry: &Geometry, expected: &'static str) -> Result<Vec<TrackSegment>> {
    match &geometry.value {
        Value::MultiLineString(lines) => lines
            .iter()
            .map(|line| {
                line.iter()
                    .map(|coords| position(coords))
                    .collect::<Result<Vec<_>>>()
                    .map(TrackSegment::new)
            })
            .collect(),
        other => Err(unsupported_value(other, expected)),
    }
}

fn route_from_feature(feature: &Feature, expected: &'static str) -> Result<Route> {
    let mut route = Route {
        points: line_points(feature_geometry(feature, expected)?, expected)?,
        ..Route::default()
    };
    if let Some(props) = &feature.properties {
        route.name = text_property(props, "name")?;
        route.cmt = text_property(props, "cmt")?;
        route.desc = text_property(props, "desc")?;
        route.src = text_property(props, "src")?;
        route.links = links_property(props)?;
        route.number = integer_property(props, "number")?;
        route.route_type = text_property(props, "type")?;
        zip_point_properties(&mut route.points, props.get("coordinatesProperties"))?;
    }
    Ok(route)
}

fn track_from_feature(feature: &Feature, expected: &'static str) -> Result<Track> {
    let mut track = Track {
        segments: track_segments(feature_geometry(feature, expected)?, expected)?,
        ..Track::default()
    };
    if let Some(props) = &feature.properties {
        track.name = text_property(props, "name")?;
        track.cmt = text_property(props, "cmt")?;
        track.desc = text_property(props, "desc")?;
        track.src = text_property(props, "src")?;
        track.links = links_property(props)?;
        track.number = integer_property(props, "number")?;
        track.track_type = text_property(props, "type")?;

        if let Some(side) = present(props.get("coordinatesProperties")) {
            let lists = side.as_array().ok_or_else(|| {
                GpxError::InvalidGeoJson("coordinatesProperties must be an array".to_string())
            })?;
            for (segment, list) in track.segments.iter_mut().zip(lists) {
                zip_point_properties(&mut segment.points, Some(list))?;
            }
        }
    }
    Ok(track)
}

/// Apply per-point property maps positionally. Extra maps or extra points
/// are left alone.
fn zip_point_properties(points: &mut [Waypoint], side: Option<&JsonValue>) -> Result<()> {
    let Some(side) = present(side) else {
        return Ok(());
    };
    let maps = side.as_array().ok_or_else(|| {
        GpxError::InvalidGeoJson("coordinatesProperties must be an array".to_string())
    })?;
    for (point, map) in points.iter_mut().zip(maps) {
        match map {
            JsonValue::Object(props) => apply_point_properties(point, props)?,
            JsonValue::Null => {}
            _ => {
                return Err(GpxError::InvalidGeoJson(
                    "coordinatesProperties entries must be objects".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn apply_point_properties(wpt: &mut Waypoint, props: &JsonObject) -> Result<()> {
    if let Some(value) = present(props.get("time")) {
        let time = value.as_str().and_then(parse_datetime);
        wpt.time = Some(time.ok_or_else(|| invalid("time", value))?);
    }
    if let Some(magvar) = decimal_property(props, "magvar")? {
        wpt.magvar = Some(Degrees::from_decimal(magvar).map_err(|e| e.in_field(PROPERTIES, "magvar"))?);
    }
    wpt.geoidheight = decimal_property(props, "geoidheight")?;
    wpt.name = text_property(props, "name")?;
    wpt.cmt = text_property(props, "cmt")?;
    wpt.desc = text_property(props, "desc")?;
    wpt.src = text_property(props, "src")?;
    wpt.links = links_property(props)?;
    wpt.sym = text_property(props, "sym")?;
    wpt.point_type = text_property(props, "type")?;
    if let Some(value) = present(props.get("fix")) {
        let fix = value.as_str().and_then(|s| s.parse::<Fix>().ok());
        wpt.fix = Some(fix.ok_or_else(|| invalid("fix", value))?);
    }
    wpt.sat = integer_property(props, "sat")?;
    wpt.hdop = decimal_property(props, "hdop")?;
    wpt.vdop = decimal_property(props, "vdop")?;
    wpt.pdop = decimal_property(props, "pdop")?;
    wpt.ageofdgpsdata = decimal_property(props, "ageofdgpsdata")?;
    if let Some(id) = integer_property::<i64>(props, "dgpsid")? {
        wpt.dgpsid = Some(DgpsStation::try_from(id).map_err(|e| e.in_field(PROPERTIES, "dgpsid"))?);
    }
    Ok(())
}

/// A member that is missing or `null` counts as absent.
fn present(value: Option<&JsonValue>) -> Option<&JsonValue> {
    value.filter(|v| !v.is_null())
}

fn invalid(field: &'static str, value: &JsonValue) -> GpxError {
    GpxError::InvalidField {
        element: PROPERTIES,
        field,
        value: value.to_string(),
    }
}

fn text_property(props: &JsonObject, key: &'static str) -> Result<Option<String>> {
    match present(props.get(key)) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(invalid(key, other)),
    }
}

fn decimal_property(props: &JsonObject, key: &'static str) -> Result<Option<Decimal>> {
    present(props.get(key))
        .map(|value| json_to_decimal(value).ok_or_else(|| invalid(key, value)))
        .transpose()
}

/// Integers may also arrive as integral floats such as `8.0`.
fn integer_property<T: TryFrom<i64>>(props: &JsonObject, key: &'static str) -> Result<Option<T>> {
    present(props.get(key))
        .map(|value| {
            let n = match value {
                JsonValue::Number(n) => n.as_i64().or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
                        .map(|f| f as i64)
                }),
                JsonValue::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            n.and_then(|n| T::try_from(n).ok())
                .ok_or_else(|| invalid(key, value))
        })
        .transpose()
}

fn links_property(props: &JsonObject) -> Result<Vec<Link>> {
    let Some(value) = present(props.get("links")) else {
        return Ok(Vec::new());
    };
    let entries = value.as_array().ok_or_else(|| invalid("links", value))?;
    entries
        .iter()
        .map(|entry| {
            let obj = entry.as_object().ok_or_else(|| invalid("links", entry))?;
            let href = text_property(obj, "href")?.ok_or(GpxError::MissingField {
                element: "link",
                field: "href",
            })?;
            Ok(Link {
                href,
                text: text_property(obj, "text")?,
                link_type: text_property(obj, "type")?,
            })
        })
        .collect()
}
