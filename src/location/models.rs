use serde::{Deserialize, Serialize};

use crate::error::AdvisoryError;

/// Fallback display name when no address field is usable
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

// ============================================================================
// Query and result types
// ============================================================================

/// What the caller asks about: a free-text place or a coordinate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationQuery {
    PlaceName(String),
    Coordinates { latitude: f64, longitude: f64 },
}

impl LocationQuery {
    pub fn place(name: impl Into<String>) -> Self {
        Self::PlaceName(name.into())
    }

    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        Self::Coordinates {
            latitude,
            longitude,
        }
    }

    /// Build a query from form-style input.
    ///
    /// A non-blank place name takes precedence; otherwise both coordinates
    /// must be present.
    pub fn from_input(
        place_name: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Self, AdvisoryError> {
        if let Some(name) = place_name.map(str::trim).filter(|n| !n.is_empty()) {
            return Ok(Self::PlaceName(name.to_string()));
        }

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(Self::Coordinates {
                latitude,
                longitude,
            }),
            _ => Err(AdvisoryError::InvalidQuery(
                "either a place name or both coordinates are required".to_string(),
            )),
        }
    }

    /// Reject queries that cannot possibly be resolved
    pub fn validate(&self) -> Result<(), AdvisoryError> {
        match self {
            Self::PlaceName(name) if name.trim().is_empty() => Err(AdvisoryError::InvalidQuery(
                "place name is empty".to_string(),
            )),
            Self::PlaceName(_) => Ok(()),
            Self::Coordinates {
                latitude,
                longitude,
            } => {
                if !latitude.is_finite() || !(-90.0..=90.0).contains(latitude) {
                    return Err(AdvisoryError::InvalidQuery(format!(
                        "latitude {} is outside -90..90",
                        latitude
                    )));
                }
                if !longitude.is_finite() || !(-180.0..=180.0).contains(longitude) {
                    return Err(AdvisoryError::InvalidQuery(format!(
                        "longitude {} is outside -180..180",
                        longitude
                    )));
                }
                Ok(())
            }
        }
    }
}

/// A point picked on the map widget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<MapPoint> for LocationQuery {
    fn from(point: MapPoint) -> Self {
        LocationQuery::coordinates(point.lat, point.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

impl ResolvedLocation {
    /// Coordinates whose name could not be looked up
    pub fn unnamed(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            display_name: UNKNOWN_LOCATION.to_string(),
        }
    }
}

// ============================================================================
// Nominatim Response (Internal)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
}

fn city(address: &NominatimAddress) -> Option<&str> {
    address.city.as_deref()
}

fn town(address: &NominatimAddress) -> Option<&str> {
    address.town.as_deref()
}

fn village(address: &NominatimAddress) -> Option<&str> {
    address.village.as_deref()
}

fn region(address: &NominatimAddress) -> Option<&str> {
    address.state.as_deref()
}

/// Address fields tried in order when picking a display name
const DISPLAY_NAME_PRIORITY: &[fn(&NominatimAddress) -> Option<&str>] =
    &[city, town, village, region];

/// One `/search` entry or a successful `/reverse` body.
/// Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub address: NominatimAddress,
}

impl NominatimPlace {
    /// First usable name: address fields by priority, then the first token
    /// of the full address, then "Unknown Location"
    pub fn best_name(&self) -> String {
        DISPLAY_NAME_PRIORITY
            .iter()
            .filter_map(|field| field(&self.address))
            .chain(
                self.display_name
                    .as_deref()
                    .and_then(|full| full.split(',').next()),
            )
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_LOCATION)
            .to_string()
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.lat.trim().parse::<f64>().ok()?;
        let lon = self.lon.trim().parse::<f64>().ok()?;
        Some((lat, lon))
    }
}

/// `/reverse` answers 200 with an `error` body when nothing is found
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum NominatimReverse {
    Found(NominatimPlace),
    NotFound { error: String },
}
