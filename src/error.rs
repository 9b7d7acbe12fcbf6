use thiserror::Error;
use wasm_bindgen::JsValue;

/// Everything that can go wrong while reading, writing or measuring GPX data.
#[derive(Error, Debug)]
pub enum GpxError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    XmlEscape(#[from] quick_xml::escape::EscapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML document has no root element")]
    EmptyDocument,

    #[error("Missing '{field}' on <{element}>")]
    MissingField {
        element: &'static str,
        field: &'static str,
    },

    #[error("Invalid value '{value}' for '{field}' on <{element}>")]
    InvalidField {
        element: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{kind} must be {expected}, got {value}")]
    OutOfRange {
        kind: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("Unsupported GeoJSON type '{found}', expected {expected}")]
    UnsupportedGeoJsonType {
        found: String,
        expected: &'static str,
    },

    #[error("Cannot compute {statistic} over an empty point sequence")]
    EmptySequence { statistic: &'static str },
}

pub type Result<T> = std::result::Result<T, GpxError>;

impl GpxError {
    /// Wrap a range violation so it reports the element and field it came from.
    pub(crate) fn in_field(self, element: &'static str, field: &'static str) -> Self {
        match self {
            Self::OutOfRange { value, .. } => Self::InvalidField {
                element,
                field,
                value,
            },
            other => other,
        }
    }

    /// True for errors caused by malformed or out-of-range field data.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. } | Self::InvalidField { .. } | Self::OutOfRange { .. }
        )
    }
}

impl From<geojson::Error> for GpxError {
    fn from(e: geojson::Error) -> Self {
        Self::InvalidGeoJson(e.to_string())
    }
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
