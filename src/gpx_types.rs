use std::fmt;

use chrono::{DateTime, Utc};

use crate::element::Namespaces;
use crate::error::Result;
use crate::types::{Decimal, Degrees, DgpsStation, Fix, Latitude, Longitude};

/// Namespace of GPX 1.1 documents.
pub const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";

/// Creator written into documents built from scratch.
pub const DEFAULT_CREATOR: &str = "gpx-geojson";

/// A GPX document: metadata followed by waypoints, routes and tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct Gpx {
    /// Name or URL of the software that created the document.
    pub creator: String,
    pub metadata: Option<Metadata>,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub tracks: Vec<Track>,
    /// Namespace map of the root element, propagated to every built child.
    pub namespaces: Namespaces,
}

impl Default for Gpx {
    fn default() -> Self {
        let mut namespaces = Namespaces::new();
        namespaces.insert(String::new(), GPX_NAMESPACE.to_string());
        Self {
            creator: DEFAULT_CREATOR.to_string(),
            metadata: None,
            waypoints: Vec::new(),
            routes: Vec::new(),
            tracks: Vec::new(),
            namespaces,
        }
    }
}

impl Gpx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata of the document, created empty on first use.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        self.metadata.get_or_insert_with(Metadata::default)
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref()?.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata_mut().name = Some(name.into());
    }

    pub fn desc(&self) -> Option<&str> {
        self.metadata.as_ref()?.desc.as_deref()
    }

    pub fn set_desc(&mut self, desc: impl Into<String>) {
        self.metadata_mut().desc = Some(desc.into());
    }

    pub fn author(&self) -> Option<&Person> {
        self.metadata.as_ref()?.author.as_ref()
    }

    pub fn set_author(&mut self, author: Person) {
        self.metadata_mut().author = Some(author);
    }

    pub fn copyright(&self) -> Option<&Copyright> {
        self.metadata.as_ref()?.copyright.as_ref()
    }

    pub fn set_copyright(&mut self, copyright: Copyright) {
        self.metadata_mut().copyright = Some(copyright);
    }

    pub fn links(&self) -> &[Link] {
        self.metadata
            .as_ref()
            .map(|m| m.links.as_slice())
            .unwrap_or_default()
    }

    pub fn set_links(&mut self, links: Vec<Link>) {
        self.metadata_mut().links = links;
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.metadata.as_ref()?.time
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.metadata_mut().time = Some(time);
    }

    pub fn keywords(&self) -> Option<&str> {
        self.metadata.as_ref()?.keywords.as_deref()
    }

    pub fn set_keywords(&mut self, keywords: impl Into<String>) {
        self.metadata_mut().keywords = Some(keywords.into());
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.metadata.as_ref()?.bounds.as_ref()
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.metadata_mut().bounds = Some(bounds);
    }
}

/// Information about the document as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub name: Option<String>,
    pub desc: Option<String>,
    pub author: Option<Person>,
    pub copyright: Option<Copyright>,
    pub links: Vec<Link>,
    pub time: Option<DateTime<Utc>>,
    pub keywords: Option<String>,
    pub bounds: Option<Bounds>,
}

/// A person or organization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub link: Option<Link>,
}

/// An email address, kept as the two halves GPX writes it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub id: String,
    pub domain: String,
}

impl Email {
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
        }
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.domain)
    }
}

/// Copyright holder and license of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Copyright {
    pub author: String,
    pub year: Option<i32>,
    /// URI of the license text.
    pub license: Option<String>,
}

impl Copyright {
    pub fn new(author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            year: None,
            license: None,
        }
    }
}

/// A link to an external resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: Option<String>,
    /// MIME type of the linked content.
    pub link_type: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: None,
            link_type: None,
        }
    }
}

/// Two corner points of the extent of the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: Latitude,
    pub min_lon: Longitude,
    pub max_lat: Latitude,
    pub max_lon: Longitude,
}

/// A single point (used for wpt, rtept, trkpt).
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub lat: Latitude,
    pub lon: Longitude,
    /// Elevation in metres.
    pub ele: Option<Decimal>,
    pub time: Option<DateTime<Utc>>,
    /// Magnetic variation.
    pub magvar: Option<Degrees>,
    /// Height of the geoid above the WGS84 ellipsoid, in metres.
    pub geoidheight: Option<Decimal>,
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<Link>,
    pub sym: Option<String>,
    pub point_type: Option<String>,
    pub fix: Option<Fix>,
    /// Number of satellites used for the fix.
    pub sat: Option<u32>,
    pub hdop: Option<Decimal>,
    pub vdop: Option<Decimal>,
    pub pdop: Option<Decimal>,
    /// Seconds since the last DGPS update.
    pub ageofdgpsdata: Option<Decimal>,
    pub dgpsid: Option<DgpsStation>,
}

impl Waypoint {
    pub fn new(lat: Latitude, lon: Longitude) -> Self {
        Self {
            lat,
            lon,
            ele: None,
            time: None,
            magvar: None,
            geoidheight: None,
            name: None,
            cmt: None,
            desc: None,
            src: None,
            links: Vec::new(),
            sym: None,
            point_type: None,
            fix: None,
            sat: None,
            hdop: None,
            vdop: None,
            pdop: None,
            ageofdgpsdata: None,
            dgpsid: None,
        }
    }

    /// Build a point from raw degrees, checking both ranges.
    pub fn from_degrees(lat: f64, lon: f64) -> Result<Self> {
        Ok(Self::new(Latitude::new(lat)?, Longitude::new(lon)?))
    }

    /// Set the elevation in metres. Fails for `NaN` and infinities.
    pub fn with_ele(mut self, ele: f64) -> Result<Self> {
        self.ele = Some(Decimal::try_from(ele)?);
        Ok(self)
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}

/// A GPX route (<rte>): turn points leading to a destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<Link>,
    pub number: Option<u32>,
    pub route_type: Option<String>,
    pub points: Vec<Waypoint>,
}

/// A GPX track (<trk>).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: Option<String>,
    pub cmt: Option<String>,
    pub desc: Option<String>,
    pub src: Option<String>,
    pub links: Vec<Link>,
    pub number: Option<u32>,
    pub track_type: Option<String>,
    pub segments: Vec<TrackSegment>,
}

/// A GPX track segment (<trkseg>). Each segment is one continuous span of
/// reception; a new segment marks a dropout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackSegment {
    pub points: Vec<Waypoint>,
}

impl TrackSegment {
    pub fn new(points: Vec<Waypoint>) -> Self {
        Self { points }
    }
}
