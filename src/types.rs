use serde::{ Deserialize, Deserializer, Serialize };

/// Dataset file envelope
/// `states` stays untyped so a single bad record can be skipped instead of failing the load
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetFile {
    /// Capture date label (e.g. "2022-06-27")
    #[serde(default)]
    pub date: String,

    /// Raw state vector records
    pub states: Vec<serde_json::Value>,
}

/// Longitude/latitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// GeoJSON coordinate order
    pub fn to_coords(self) -> Vec<f64> {
        vec![self.lon, self.lat]
    }
}

/// One observation of one aircraft at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    /// Epoch seconds
    pub time: i64,

    /// ICAO 24-bit transponder address (hex string)
    #[serde(alias = "entityId")]
    pub icao24: String,

    pub lat: f64,

    pub lon: f64,

    /// True track in degrees (0-360)
    #[serde(default, deserialize_with = "null_as_default")]
    pub heading: f64,

    /// Flight callsign, frequently padded with blanks
    #[serde(default, alias = "label", deserialize_with = "null_as_default")]
    pub callsign: String,

    /// Ground speed in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,

    /// Vertical rate in m/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertrate: Option<f64>,

    /// Barometric altitude in meters
    #[serde(default, alias = "altitude", skip_serializing_if = "Option::is_none")]
    pub baroaltitude: Option<f64>,

    /// Geometric altitude in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geoaltitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub squawk: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub onground: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub alert: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub spi: bool,
}

impl StateVector {
    pub fn position(&self) -> Position {
        Position::new(self.lon, self.lat)
    }

    /// Display label with the feed's blank padding removed
    pub fn label(&self) -> &str {
        self.callsign.trim()
    }

    pub fn entity_id(&self) -> &str {
        &self.icao24
    }
}

/// Feeds send explicit nulls for unknown values
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Single sample of a trail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub position: Position,
    pub time: i64,
}
