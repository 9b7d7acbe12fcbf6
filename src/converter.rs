use geojson::{Bbox, Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use log::debug;
use serde_json::Value as JsonValue;

use crate::encoding::{decimal_to_json, format_datetime};
use crate::gpx_types::*;
use crate::options::{CollectionKind, ConvertOptions, GpxElementType};
use crate::types::{Decimal, Degrees};

/// GeoJSON shape of a single waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaypointShape {
    Point,
    #[default]
    Feature,
}

/// GeoJSON shape of a route or a track segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineShape {
    LineString,
    #[default]
    Feature,
}

/// GeoJSON shape of a track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackShape {
    MultiLineString,
    #[default]
    Feature,
}

impl Waypoint {
    pub fn to_geojson(&self, shape: WaypointShape) -> GeoJson {
        match shape {
            WaypointShape::Point => GeoJson::Geometry(self.geometry()),
            WaypointShape::Feature => GeoJson::Feature(self.feature()),
        }
    }

    pub(crate) fn geometry(&self) -> Geometry {
        Geometry::new(Value::Point(self.coordinates()))
    }

    pub(crate) fn feature(&self) -> Feature {
        feature(self.geometry(), self.properties())
    }

    /// `[lon, lat]`, or `[lon, lat, ele]` when the point has an elevation.
    pub(crate) fn coordinates(&self) -> Vec<f64> {
        let mut position = vec![self.lon.value(), self.lat.value()];
        if let Some(ele) = self.ele {
            position.push(ele.value());
        }
        position
    }

    /// Every present optional field, keyed by its GPX element name.
    pub(crate) fn properties(&self) -> JsonObject {
        let mut props = JsonObject::new();
        if let Some(time) = &self.time {
            props.insert("time".to_string(), JsonValue::String(format_datetime(time)));
        }
        insert_decimal(&mut props, "magvar", self.magvar.map(Degrees::decimal));
        insert_decimal(&mut props, "geoidheight", self.geoidheight);
        insert_text(&mut props, "name", &self.name);
        insert_text(&mut props, "cmt", &self.cmt);
        insert_text(&mut props, "desc", &self.desc);
        insert_text(&mut props, "src", &self.src);
        insert_links(&mut props, &self.links);
        insert_text(&mut props, "sym", &self.sym);
        insert_text(&mut props, "type", &self.point_type);
        if let Some(fix) = self.fix {
            props.insert("fix".to_string(), JsonValue::String(fix.to_string()));
        }
        if let Some(sat) = self.sat {
            props.insert("sat".to_string(), JsonValue::from(sat));
        }
        insert_decimal(&mut props, "hdop", self.hdop);
        insert_decimal(&mut props, "vdop", self.vdop);
        insert_decimal(&mut props, "pdop", self.pdop);
        insert_decimal(&mut props, "ageofdgpsdata", self.ageofdgpsdata);
        if let Some(dgpsid) = self.dgpsid {
            props.insert("dgpsid".to_string(), JsonValue::from(dgpsid.value()));
        }
        props
    }
}

impl Route {
    pub fn to_geojson(&self, shape: LineShape) -> GeoJson {
        match shape {
            LineShape::LineString => GeoJson::Geometry(self.geometry()),
            LineShape::Feature => GeoJson::Feature(self.feature()),
        }
    }

    pub(crate) fn geometry(&self) -> Geometry {
        line_string(&self.points)
    }

    pub(crate) fn feature(&self) -> Feature {
        let mut props = JsonObject::new();
        insert_text(&mut props, "name", &self.name);
        insert_text(&mut props, "cmt", &self.cmt);
        insert_text(&mut props, "desc", &self.desc);
        insert_text(&mut props, "src", &self.src);
        insert_links(&mut props, &self.links);
        if let Some(n) = self.number {
            props.insert("number".to_string(), JsonValue::from(n));
        }
        insert_text(&mut props, "type", &self.route_type);
        if let Some(cp) = coordinates_properties(&self.points) {
            props.insert("coordinatesProperties".to_string(), cp);
        }
        feature(self.geometry(), props)
    }
}

impl TrackSegment {
    pub fn to_geojson(&self, shape: LineShape) -> GeoJson {
        match shape {
            LineShape::LineString => GeoJson::Geometry(line_string(&self.points)),
            LineShape::Feature => {
                let mut props = JsonObject::new();
                if let Some(cp) = coordinates_properties(&self.points) {
                    props.insert("coordinatesProperties".to_string(), cp);
                }
                GeoJson::Feature(feature(line_string(&self.points), props))
            }
        }
    }
}

impl Track {
    pub fn to_geojson(&self, shape: TrackShape) -> GeoJson {
        match shape {
            TrackShape::MultiLineString => GeoJson::Geometry(self.geometry()),
            TrackShape::Feature => GeoJson::Feature(self.feature()),
        }
    }

    pub(crate) fn geometry(&self) -> Geometry {
        let lines = self
            .segments
            .iter()
            .map(|seg| seg.points.iter().map(Waypoint::coordinates).collect())
            .collect();
        Geometry {
            bbox: bbox_of(self.segments.iter().flat_map(|seg| seg.points.iter())),
            value: Value::MultiLineString(lines),
            foreign_members: None,
        }
    }

    pub(crate) fn feature(&self) -> Feature {
        let mut props = JsonObject::new();
        insert_text(&mut props, "name", &self.name);
        insert_text(&mut props, "cmt", &self.cmt);
        insert_text(&mut props, "desc", &self.desc);
        insert_text(&mut props, "src", &self.src);
        insert_links(&mut props, &self.links);
        if let Some(n) = self.number {
            props.insert("number".to_string(), JsonValue::from(n));
        }
        insert_text(&mut props, "type", &self.track_type);

        let nested: Vec<Vec<JsonObject>> = self
            .segments
            .iter()
            .map(|seg| seg.points.iter().map(Waypoint::properties).collect())
            .collect();
        if nested.iter().flatten().any(|p| !p.is_empty()) {
            let lists = nested
                .into_iter()
                .map(|maps| JsonValue::Array(maps.into_iter().map(JsonValue::Object).collect()))
                .collect();
            props.insert("coordinatesProperties".to_string(), JsonValue::Array(lists));
        }
        feature(self.geometry(), props)
    }
}

impl Gpx {
    /// Convert every waypoint, route and track into one collection.
    pub fn to_geojson(&self, collection: CollectionKind) -> GeoJson {
        to_geojson_with(self, &ConvertOptions::new(collection))
    }
}

/// Convert a document to a GeoJSON collection, keeping only the entity kinds
/// `opts` selects. The collection bbox covers the kept entities only.
pub fn to_geojson_with(gpx: &Gpx, opts: &ConvertOptions) -> GeoJson {
    let waypoints: &[Waypoint] = if opts.should_include(GpxElementType::Waypoint) {
        &gpx.waypoints
    } else {
        &[]
    };
    let routes: &[Route] = if opts.should_include(GpxElementType::Route) {
        &gpx.routes
    } else {
        &[]
    };
    let tracks: &[Track] = if opts.should_include(GpxElementType::Track) {
        &gpx.tracks
    } else {
        &[]
    };

    let bbox = bbox_of(
        waypoints
            .iter()
            .chain(routes.iter().flat_map(|rte| rte.points.iter()))
            .chain(
                tracks
                    .iter()
                    .flat_map(|trk| trk.segments.iter())
                    .flat_map(|seg| seg.points.iter()),
            ),
    );

    debug!(
        "converting GPX to {:?}: {} waypoints, {} routes, {} tracks",
        opts.collection,
        waypoints.len(),
        routes.len(),
        tracks.len()
    );

    match opts.collection {
        CollectionKind::GeometryCollection => {
            let geometries = waypoints
                .iter()
                .map(Waypoint::geometry)
                .chain(routes.iter().map(Route::geometry))
                .chain(tracks.iter().map(Track::geometry))
                .collect();
            GeoJson::Geometry(Geometry {
                bbox,
                value: Value::GeometryCollection(geometries),
                foreign_members: None,
            })
        }
        CollectionKind::FeatureCollection => {
            let features = waypoints
                .iter()
                .map(Waypoint::feature)
                .chain(routes.iter().map(Route::feature))
                .chain(tracks.iter().map(Track::feature))
                .collect();
            GeoJson::FeatureCollection(FeatureCollection {
                bbox,
                features,
                foreign_members: None,
            })
        }
    }
}

/// `[minlon, minlat, maxlon, maxlat]`, widened to
/// `[minlon, minlat, minele, maxlon, maxlat, maxele]` when any point has an
/// elevation. `None` without points.
pub(crate) fn bbox_of<'a>(points: impl Iterator<Item = &'a Waypoint>) -> Option<Bbox> {
    struct Extent {
        lon: (f64, f64),
        lat: (f64, f64),
        ele: Option<(f64, f64)>,
    }

    let extent = points.fold(None, |acc: Option<Extent>, pt| {
        let (lon, lat) = (pt.lon.value(), pt.lat.value());
        let ele = pt.ele.map(Decimal::value);
        Some(match acc {
            None => Extent {
                lon: (lon, lon),
                lat: (lat, lat),
                ele: ele.map(|e| (e, e)),
            },
            Some(ext) => Extent {
                lon: (ext.lon.0.min(lon), ext.lon.1.max(lon)),
                lat: (ext.lat.0.min(lat), ext.lat.1.max(lat)),
                ele: match (ext.ele, ele) {
                    (Some((lo, hi)), Some(e)) => Some((lo.min(e), hi.max(e))),
                    (None, Some(e)) => Some((e, e)),
                    (range, None) => range,
                },
            },
        })
    })?;

    Some(match extent.ele {
        Some((min_ele, max_ele)) => vec![
            extent.lon.0,
            extent.lat.0,
            min_ele,
            extent.lon.1,
            extent.lat.1,
            max_ele,
        ],
        None => vec![extent.lon.0, extent.lat.0, extent.lon.1, extent.lat.1],
    })
}

fn line_string(points: &[Waypoint]) -> Geometry {
    Geometry {
        bbox: bbox_of(points.iter()),
        value: Value::LineString(points.iter().map(Waypoint::coordinates).collect()),
        foreign_members: None,
    }
}

/// Empty property maps become `"properties": null`.
fn feature(geometry: Geometry, props: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: (!props.is_empty()).then_some(props),
        foreign_members: None,
    }
}

/// Per-point property maps aligned with the coordinates, or `None` when no
/// point has any property.
fn coordinates_properties(points: &[Waypoint]) -> Option<JsonValue> {
    let maps: Vec<JsonObject> = points.iter().map(Waypoint::properties).collect();
    if maps.iter().all(JsonObject::is_empty) {
        return None;
    }
    Some(JsonValue::Array(
        maps.into_iter().map(JsonValue::Object).collect(),
    ))
}

fn insert_text(props: &mut JsonObject, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), JsonValue::String(v.clone()));
    }
}

fn insert_decimal(props: &mut JsonObject, key: &str, value: Option<Decimal>) {
    if let Some(v) = value {
        props.insert(key.to_string(), decimal_to_json(v));
    }
}

fn insert_links(props: &mut JsonObject, links: &[Link]) {
    if links.is_empty() {
        return;
    }
    let links = links
        .iter()
        .map(|link| {
            let mut link_obj = JsonObject::new();
            link_obj.insert("href".to_string(), JsonValue::String(link.href.clone()));
            insert_text(&mut link_obj, "text", &link.text);
            insert_text(&mut link_obj, "type", &link.link_type);
            JsonValue::Object(link_obj)
        })
        .collect();
    props.insert("links".to_string(), JsonValue::Array(links));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use crate::types::Fix;

    fn to_json(geojson: &GeoJson) -> JsonValue {
        serde_json::to_value(geojson).unwrap()
    }

    fn pt(lat: f64, lon: f64) -> Waypoint {
        Waypoint::from_degrees(lat, lon).unwrap()
    }

    #[test]
    fn test_waypoint_point_coordinate_order() {
        let json = to_json(&pt(35.6762, 139.6503).with_ele(40.5).unwrap().to_geojson(WaypointShape::Point));
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"], json!([139.6503, 35.6762, 40.5]));
    }

    #[test]
    fn test_waypoint_feature_properties() {
        let mut wpt = pt(35.0, 139.0);
        wpt.name = Some("Tokyo".to_string());
        wpt.time = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        wpt.fix = Some(Fix::ThreeD);
        wpt.sat = Some(7);
        wpt.hdop = Some("1.5".parse().unwrap());

        let json = to_json(&wpt.to_geojson(WaypointShape::Feature));
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["coordinates"], json!([139.0, 35.0]));
        let props = &json["properties"];
        assert_eq!(props["name"], "Tokyo");
        assert_eq!(props["time"], "2025-01-01T00:00:00Z");
        assert_eq!(props["fix"], "3d");
        assert_eq!(props["sat"], 7);
        assert_eq!(props["hdop"], 1.5);
        assert!(props.get("links").is_none());
        assert!(props.get("ele").is_none());
    }

    #[test]
    fn test_bare_waypoint_has_null_properties() {
        let json = to_json(&pt(1.0, 2.0).to_geojson(WaypointShape::Feature));
        assert!(json["properties"].is_null());
    }

    #[test]
    fn test_single_link_becomes_one_element_array() {
        let mut wpt = pt(1.0, 2.0);
        let mut link = Link::new("https://example.com");
        link.text = Some("Home".to_string());
        wpt.links.push(link);

        let json = to_json(&wpt.to_geojson(WaypointShape::Feature));
        assert_eq!(
            json["properties"]["links"],
            json!([{"href": "https://example.com", "text": "Home"}])
        );
    }

    #[test]
    fn test_route_line_string_bbox() {
        let rte = Route {
            points: vec![pt(0.0, 0.0).with_ele(5.0).unwrap(), pt(2.0, -3.0), pt(1.0, 4.0).with_ele(-1.0).unwrap()],
            ..Route::default()
        };
        let json = to_json(&rte.to_geojson(LineShape::LineString));
        assert_eq!(json["type"], "LineString");
        assert_eq!(json["bbox"], json!([-3.0, 0.0, -1.0, 4.0, 2.0, 5.0]));
        // mixed 2- and 3-component positions are kept as they are
        assert_eq!(json["coordinates"][1], json!([-3.0, 2.0]));
        assert_eq!(json["coordinates"][2], json!([4.0, 1.0, -1.0]));
    }

    #[test]
    fn test_route_side_channel_alignment() {
        let mut named = pt(0.0, 1.0);
        named.name = Some("Turn".to_string());
        let rte = Route {
            name: Some("Loop".to_string()),
            number: Some(3),
            points: vec![pt(0.0, 0.0), named, pt(0.0, 2.0)],
            ..Route::default()
        };

        let json = to_json(&rte.to_geojson(LineShape::Feature));
        let props = &json["properties"];
        assert_eq!(props["name"], "Loop");
        assert_eq!(props["number"], 3);
        let side = props["coordinatesProperties"].as_array().unwrap();
        let coords = json["geometry"]["coordinates"].as_array().unwrap();
        assert_eq!(side.len(), coords.len());
        assert_eq!(side[0], json!({}));
        assert_eq!(side[1], json!({"name": "Turn"}));
    }

    #[test]
    fn test_side_channel_omitted_without_point_properties() {
        let rte = Route {
            points: vec![pt(0.0, 0.0), pt(0.0, 1.0)],
            ..Route::default()
        };
        let json = to_json(&rte.to_geojson(LineShape::Feature));
        assert!(json["properties"].is_null());
    }

    #[test]
    fn test_track_nested_side_channel() {
        let timed = pt(0.0, 1.0).with_time(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let trk = Track {
            name: Some("Run".to_string()),
            segments: vec![
                TrackSegment::new(vec![pt(0.0, 0.0), timed]),
                TrackSegment::new(vec![pt(1.0, 1.0)]),
            ],
            ..Track::default()
        };

        let json = to_json(&trk.to_geojson(TrackShape::Feature));
        assert_eq!(json["geometry"]["type"], "MultiLineString");
        assert_eq!(json["geometry"]["bbox"], json!([0.0, 0.0, 1.0, 1.0]));
        let side = &json["properties"]["coordinatesProperties"];
        assert_eq!(
            side,
            &json!([[{}, {"time": "2025-01-01T00:00:00Z"}], [{}]])
        );
    }

    #[test]
    fn test_segment_shapes() {
        let seg = TrackSegment::new(vec![pt(0.0, 0.0), pt(1.0, 1.0)]);
        assert_eq!(to_json(&seg.to_geojson(LineShape::LineString))["type"], "LineString");
        let json = to_json(&seg.to_geojson(LineShape::Feature));
        assert_eq!(json["type"], "Feature");
        assert!(json["properties"].is_null());
    }

    #[test]
    fn test_document_bbox_without_elevation() {
        let gpx = Gpx {
            waypoints: vec![pt(0.0, -10.0)],
            routes: vec![Route {
                points: vec![pt(5.0, 10.0), pt(2.0, 0.0)],
                ..Route::default()
            }],
            ..Gpx::new()
        };

        let json = to_json(&gpx.to_geojson(CollectionKind::FeatureCollection));
        assert_eq!(json["type"], "FeatureCollection");
        assert_eq!(json["bbox"], json!([-10.0, 0.0, 10.0, 5.0]));
        assert_eq!(json["features"].as_array().unwrap().len(), 2);

        let json = to_json(&gpx.to_geojson(CollectionKind::GeometryCollection));
        assert_eq!(json["type"], "GeometryCollection");
        assert_eq!(json["bbox"], json!([-10.0, 0.0, 10.0, 5.0]));
        assert_eq!(json["geometries"][0]["type"], "Point");
        assert_eq!(json["geometries"][1]["type"], "LineString");
    }

    #[test]
    fn test_empty_document_has_no_bbox() {
        let json = to_json(&Gpx::new().to_geojson(CollectionKind::FeatureCollection));
        assert!(json.get("bbox").is_none() || json["bbox"].is_null());
        assert_eq!(json["features"], json!([]));
    }

    #[test]
    fn test_type_filter_narrows_bbox() {
        let gpx = Gpx {
            waypoints: vec![pt(50.0, 50.0)],
            tracks: vec![Track {
                segments: vec![TrackSegment::new(vec![pt(0.0, 0.0), pt(1.0, 1.0)])],
                ..Track::default()
            }],
            ..Gpx::new()
        };
        let opts = ConvertOptions {
            types: Some(vec![GpxElementType::Track]),
            ..ConvertOptions::default()
        };
        let json = to_json(&to_geojson_with(&gpx, &opts));
        assert_eq!(json["features"].as_array().unwrap().len(), 1);
        assert_eq!(json["bbox"], json!([0.0, 0.0, 1.0, 1.0]));
    }
}
