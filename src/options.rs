use serde::Deserialize;

/// Options for GPX to GeoJSON conversion.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Collection object the document becomes (default: FeatureCollection)
    #[serde(default)]
    pub collection: CollectionKind,

    /// Which GPX element types to convert (default: all)
    #[serde(default)]
    pub types: Option<Vec<GpxElementType>>,
}

impl ConvertOptions {
    pub fn new(collection: CollectionKind) -> Self {
        Self {
            collection,
            types: None,
        }
    }

    pub fn should_include(&self, element_type: GpxElementType) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(&element_type),
        }
    }
}

/// GeoJSON object a whole document converts to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum CollectionKind {
    #[default]
    FeatureCollection,
    GeometryCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpxElementType {
    Waypoint,
    Route,
    Track,
}
