use std::str::FromStr;

use log::debug;

use crate::element::Element;
use crate::encoding::{format_datetime, parse_datetime, parse_decimal};
use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::types::{Decimal, Latitude, Longitude};

/// An entity with a GPX element representation.
pub trait GpxElement: Sized {
    /// Tag the entity is written as when no other tag is requested.
    const TAG: &'static str;

    fn parse(element: &Element) -> Result<Self>;

    /// Fill an already created element with this entity's attributes and
    /// children.
    fn build_into(&self, element: &mut Element);

    fn build(&self, parent: &mut Element) {
        self.build_as(parent, Self::TAG);
    }

    fn build_as(&self, parent: &mut Element, tag: &str) {
        self.build_into(parent.append_child(tag));
    }
}

impl Gpx {
    /// Read a document from its root `<gpx>` element.
    pub fn from_element(root: &Element) -> Result<Self> {
        <Self as GpxElement>::parse(root)
    }

    /// Build the root `<gpx>` element, carrying the document's namespace map.
    pub fn to_element(&self) -> Element {
        let mut root = Element::new(Self::TAG, self.namespaces.clone());
        self.build_into(&mut root);
        root
    }

    pub fn to_xml_string(&self) -> Result<String> {
        self.to_element().to_xml_string()
    }
}

impl FromStr for Gpx {
    type Err = GpxError;

    fn from_str(xml: &str) -> Result<Self> {
        Self::from_element(&Element::parse_str(xml)?)
    }
}

impl GpxElement for Gpx {
    const TAG: &'static str = "gpx";

    fn parse(element: &Element) -> Result<Self> {
        let mut gpx = Gpx {
            namespaces: element.namespaces().clone(),
            ..Gpx::default()
        };
        if let Some(creator) = element.attribute("creator") {
            gpx.creator = creator.to_string();
        }
        gpx.metadata = element.find("metadata").map(Metadata::parse).transpose()?;
        gpx.waypoints = parse_all(element, "wpt")?;
        gpx.routes = parse_all(element, "rte")?;
        gpx.tracks = parse_all(element, "trk")?;

        debug!(
            "parsed GPX document: {} waypoints, {} routes, {} tracks",
            gpx.waypoints.len(),
            gpx.routes.len(),
            gpx.tracks.len()
        );
        Ok(gpx)
    }

    fn build_into(&self, element: &mut Element) {
        element.set_attribute("version", "1.1");
        element.set_attribute("creator", self.creator.as_str());
        if let Some(metadata) = &self.metadata {
            metadata.build(element);
        }
        for wpt in &self.waypoints {
            wpt.build(element);
        }
        for rte in &self.routes {
            rte.build(element);
        }
        for trk in &self.tracks {
            trk.build(element);
        }
    }
}

impl GpxElement for Metadata {
    const TAG: &'static str = "metadata";

    fn parse(element: &Element) -> Result<Self> {
        Ok(Metadata {
            name: child_string(element, "name"),
            desc: child_string(element, "desc"),
            author: element.find("author").map(Person::parse).transpose()?,
            copyright: element.find("copyright").map(Copyright::parse).transpose()?,
            links: parse_all(element, "link")?,
            time: child_time(element, Self::TAG, "time")?,
            keywords: child_string(element, "keywords"),
            bounds: element.find("bounds").map(Bounds::parse).transpose()?,
        })
    }

    fn build_into(&self, element: &mut Element) {
        push_text(element, "name", self.name.as_ref());
        push_text(element, "desc", self.desc.as_ref());
        if let Some(author) = &self.author {
            author.build(element);
        }
        if let Some(copyright) = &self.copyright {
            copyright.build(element);
        }
        for link in &self.links {
            link.build(element);
        }
        push_text(element, "time", self.time.as_ref().map(format_datetime));
        push_text(element, "keywords", self.keywords.as_ref());
        if let Some(bounds) = &self.bounds {
            bounds.build(element);
        }
    }
}

impl GpxElement for Person {
    const TAG: &'static str = "author";

    fn parse(element: &Element) -> Result<Self> {
        let email = match element.find("email") {
            Some(email) => {
                let id = required_attribute(email, "email", "id")?;
                let domain = required_attribute(email, "email", "domain")?;
                Some(Email::new(id, domain))
            }
            None => None,
        };
        Ok(Person {
            name: child_string(element, "name"),
            email,
            link: element.find("link").map(Link::parse).transpose()?,
        })
    }

    fn build_into(&self, element: &mut Element) {
        push_text(element, "name", self.name.as_ref());
        if let Some(email) = &self.email {
            let node = element.append_child("email");
            node.set_attribute("id", email.id.as_str());
            node.set_attribute("domain", email.domain.as_str());
        }
        if let Some(link) = &self.link {
            link.build(element);
        }
    }
}

impl GpxElement for Copyright {
    const TAG: &'static str = "copyright";

    fn parse(element: &Element) -> Result<Self> {
        Ok(Copyright {
            author: required_attribute(element, Self::TAG, "author")?.to_string(),
            year: child_value(element, Self::TAG, "year")?,
            license: child_string(element, "license"),
        })
    }

    fn build_into(&self, element: &mut Element) {
        element.set_attribute("author", self.author.as_str());
        push_text(element, "year", self.year);
        push_text(element, "license", self.license.as_ref());
    }
}

impl GpxElement for Link {
    const TAG: &'static str = "link";

    fn parse(element: &Element) -> Result<Self> {
        Ok(Link {
            href: required_attribute(element, Self::TAG, "href")?.to_string(),
            text: child_string(element, "text"),
            link_type: child_string(element, "type"),
        })
    }

    fn build_into(&self, element: &mut Element) {
        element.set_attribute("href", self.href.as_str());
        push_text(element, "text", self.text.as_ref());
        push_text(element, "type", self.link_type.as_ref());
    }
}

impl GpxElement for Bounds {
    const TAG: &'static str = "bounds";

    fn parse(element: &Element) -> Result<Self> {
        Ok(Bounds {
            min_lat: attribute_value::<Latitude>(element, Self::TAG, "minlat")?,
            min_lon: attribute_value::<Longitude>(element, Self::TAG, "minlon")?,
            max_lat: attribute_value::<Latitude>(element, Self::TAG, "maxlat")?,
            max_lon: attribute_value::<Longitude>(element, Self::TAG, "maxlon")?,
        })
    }

    fn build_into(&self, element: &mut Element) {
        element.set_attribute("minlat", self.min_lat.to_string());
        element.set_attribute("minlon", self.min_lon.to_string());
        element.set_attribute("maxlat", self.max_lat.to_string());
        element.set_attribute("maxlon", self.max_lon.to_string());
    }
}

impl GpxElement for Waypoint {
    const TAG: &'static str = "wpt";

    fn parse(element: &Element) -> Result<Self> {
        let tag = match element.name() {
            "rtept" => "rtept",
            "trkpt" => "trkpt",
            _ => Self::TAG,
        };

        let mut wpt = Waypoint::new(
            attribute_value(element, tag, "lat")?,
            attribute_value(element, tag, "lon")?,
        );

        // position
        wpt.ele = child_decimal(element, tag, "ele")?;
        wpt.time = child_time(element, tag, "time")?;
        wpt.magvar = child_value(element, tag, "magvar")?;
        wpt.geoidheight = child_decimal(element, tag, "geoidheight")?;

        // description
        wpt.name = child_string(element, "name");
        wpt.cmt = child_string(element, "cmt");
        wpt.desc = child_string(element, "desc");
        wpt.src = child_string(element, "src");
        wpt.links = parse_all(element, "link")?;
        wpt.sym = child_string(element, "sym");
        wpt.point_type = child_string(element, "type");

        // accuracy
        wpt.fix = child_value(element, tag, "fix")?;
        wpt.sat = child_value(element, tag, "sat")?;
        wpt.hdop = child_decimal(element, tag, "hdop")?;
        wpt.vdop = child_decimal(element, tag, "vdop")?;
        wpt.pdop = child_decimal(element, tag, "pdop")?;
        wpt.ageofdgpsdata = child_decimal(element, tag, "ageofdgpsdata")?;
        wpt.dgpsid = child_value(element, tag, "dgpsid")?;

        Ok(wpt)
    }

    fn build_into(&self, element: &mut Element) {
        element.set_attribute("lat", self.lat.to_string());
        element.set_attribute("lon", self.lon.to_string());

        push_text(element, "ele", self.ele);
        push_text(element, "time", self.time.as_ref().map(format_datetime));
        push_text(element, "magvar", self.magvar);
        push_text(element, "geoidheight", self.geoidheight);

        push_text(element, "name", self.name.as_ref());
        push_text(element, "cmt", self.cmt.as_ref());
        push_text(element, "desc", self.desc.as_ref());
        push_text(element, "src", self.src.as_ref());
        for link in &self.links {
            link.build(element);
        }
        push_text(element, "sym", self.sym.as_ref());
        push_text(element, "type", self.point_type.as_ref());

        push_text(element, "fix", self.fix);
        push_text(element, "sat", self.sat);
        push_text(element, "hdop", self.hdop);
        push_text(element, "vdop", self.vdop);
        push_text(element, "pdop", self.pdop);
        push_text(element, "ageofdgpsdata", self.ageofdgpsdata);
        push_text(element, "dgpsid", self.dgpsid);
    }
}

impl GpxElement for Route {
    const TAG: &'static str = "rte";

    fn parse(element: &Element) -> Result<Self> {
        Ok(Route {
            name: child_string(element, "name"),
            cmt: child_string(element, "cmt"),
            desc: child_string(element, "desc"),
            src: child_string(element, "src"),
            links: parse_all(element, "link")?,
            number: child_value(element, Self::TAG, "number")?,
            route_type: child_string(element, "type"),
            points: parse_all(element, "rtept")?,
        })
    }

    fn build_into(&self, element: &mut Element) {
        push_text(element, "name", self.name.as_ref());
        push_text(element, "cmt", self.cmt.as_ref());
        push_text(element, "desc", self.desc.as_ref());
        push_text(element, "src", self.src.as_ref());
        for link in &self.links {
            link.build(element);
        }
        push_text(element, "number", self.number);
        push_text(element, "type", self.route_type.as_ref());
        for pt in &self.points {
            pt.build_as(element, "rtept");
        }
    }
}

impl GpxElement for Track {
    const TAG: &'static str = "trk";

    fn parse(element: &Element) -> Result<Self> {
        Ok(Track {
            name: child_string(element, "name"),
            cmt: child_string(element, "cmt"),
            desc: child_string(element, "desc"),
            src: child_string(element, "src"),
            links: parse_all(element, "link")?,
            number: child_value(element, Self::TAG, "number")?,
            track_type: child_string(element, "type"),
            segments: parse_all(element, "trkseg")?,
        })
    }

    fn build_into(&self, element: &mut Element) {
        push_text(element, "name", self.name.as_ref());
        push_text(element, "cmt", self.cmt.as_ref());
        push_text(element, "desc", self.desc.as_ref());
        push_text(element, "src", self.src.as_ref());
        for link in &self.links {
            link.build(element);
        }
        push_text(element, "number", self.number);
        push_text(element, "type", self.track_type.as_ref());
        for seg in &self.segments {
            seg.build(element);
        }
    }
}

impl GpxElement for TrackSegment {
    const TAG: &'static str = "trkseg";

    fn parse(element: &Element) -> Result<Self> {
        Ok(TrackSegment {
            points: parse_all(element, "trkpt")?,
        })
    }

    fn build_into(&self, element: &mut Element) {
        for pt in &self.points {
            pt.build_as(element, "trkpt");
        }
    }
}

fn parse_all<T: GpxElement>(element: &Element, name: &str) -> Result<Vec<T>> {
    element.find_all(name).map(T::parse).collect()
}

fn child_string(element: &Element, name: &str) -> Option<String> {
    element.find(name).and_then(Element::text).map(str::to_string)
}

fn child_text<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element.find(name).and_then(Element::text)
}

fn child_value<T: FromStr>(
    element: &Element,
    tag: &'static str,
    field: &'static str,
) -> Result<Option<T>> {
    child_text(element, field)
        .map(|text| {
            text.trim().parse::<T>().map_err(|_| GpxError::InvalidField {
                element: tag,
                field,
                value: text.to_string(),
            })
        })
        .transpose()
}

fn child_decimal(element: &Element, tag: &'static str, field: &'static str) -> Result<Option<Decimal>> {
    child_text(element, field)
        .map(|text| {
            parse_decimal(text).ok_or_else(|| GpxError::InvalidField {
                element: tag,
                field,
                value: text.to_string(),
            })
        })
        .transpose()
}

fn child_time(
    element: &Element,
    tag: &'static str,
    field: &'static str,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    child_text(element, field)
        .map(|text| {
            parse_datetime(text).ok_or_else(|| GpxError::InvalidField {
                element: tag,
                field,
                value: text.to_string(),
            })
        })
        .transpose()
}

fn required_attribute<'a>(
    element: &'a Element,
    tag: &'static str,
    name: &'static str,
) -> Result<&'a str> {
    element.attribute(name).ok_or(GpxError::MissingField {
        element: tag,
        field: name,
    })
}

fn attribute_value<T>(element: &Element, tag: &'static str, name: &'static str) -> Result<T>
where
    T: FromStr<Err = GpxError>,
{
    required_attribute(element, tag, name)?
        .parse::<T>()
        .map_err(|e| e.in_field(tag, name))
}

fn push_text<T: ToString>(element: &mut Element, name: &str, value: Option<T>) {
    if let Some(value) = value {
        element.append_text_child(name, value.to_string());
    }
}
