pub mod models;
pub mod service;

pub use models::{LocationQuery, MapPoint, ResolvedLocation, UNKNOWN_LOCATION};
pub use service::{GeocodeError, Geocoder, LocationResolver, NominatimClient};
