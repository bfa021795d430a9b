use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client};
use thiserror::Error;

use super::models::*;
use crate::cache::{coordinate_cache_key, place_cache_key, GeoCache};
use crate::error::{log_error, AdvisoryError};

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("Failed to reach geocoding service: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Geocoding API error: {0}")]
    ApiError(String),

    #[error("Invalid geocoding response: {0}")]
    InvalidResponse(String),
}

/// Upstream that maps place names to coordinates and back
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Forward lookup: place name to coordinates and a display name
    async fn search(&self, place_name: &str) -> Result<ResolvedLocation, GeocodeError>;

    /// Reverse lookup: display name for the given coordinates
    async fn reverse(&self, latitude: f64, longitude: f64)
        -> Result<ResolvedLocation, GeocodeError>;
}

/// Client for the OpenStreetMap Nominatim API
/// https://nominatim.org/release-docs/develop/api/Overview/
pub struct NominatimClient {
    client: Client,
    base_url: String,
    user_agent: String,
    accept_language: String,
}

impl NominatimClient {
    pub fn new(client: Client, base_url: &str, user_agent: &str, accept_language: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
            accept_language: accept_language.to_string(),
        }
    }

    async fn get(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, GeocodeError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .query(query)
            .query(&[
                ("format", "json"),
                ("accept-language", self.accept_language.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(endpoint = %endpoint, status = %status, "Received Nominatim response");

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeocodeError::ApiError(format!("HTTP {}: {}", status, text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn search(&self, place_name: &str) -> Result<ResolvedLocation, GeocodeError> {
        tracing::debug!(place = %place_name, "Geocoding place name");

        let response = self
            .get(
                "search",
                &[
                    ("q", place_name.to_string()),
                    ("limit", "1".to_string()),
                    ("addressdetails", "1".to_string()),
                ],
            )
            .await?;

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::LocationNotFound(place_name.to_string()))?;

        let (latitude, longitude) = place.coordinates().ok_or_else(|| {
            GeocodeError::InvalidResponse(format!(
                "unparseable coordinates '{}', '{}'",
                place.lat, place.lon
            ))
        })?;

        Ok(ResolvedLocation {
            latitude,
            longitude,
            display_name: place.best_name(),
        })
    }

    async fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ResolvedLocation, GeocodeError> {
        tracing::debug!(lat = %latitude, lon = %longitude, "Reverse geocoding coordinates");

        let response = self
            .get(
                "reverse",
                &[("lat", latitude.to_string()), ("lon", longitude.to_string())],
            )
            .await?;

        let body: NominatimReverse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        match body {
            // Keep the caller's coordinates; Nominatim snaps to the nearest feature
            NominatimReverse::Found(place) => Ok(ResolvedLocation {
                latitude,
                longitude,
                display_name: place.best_name(),
            }),
            NominatimReverse::NotFound { error } => Err(GeocodeError::LocationNotFound(error)),
        }
    }
}

/// Turns a `LocationQuery` into coordinates plus a display name
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: GeoCache,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, cache: GeoCache) -> Self {
        Self { geocoder, cache }
    }

    pub async fn resolve(&self, query: &LocationQuery) -> Result<ResolvedLocation, AdvisoryError> {
        match query {
            LocationQuery::PlaceName(name) => self.resolve_place(name).await,
            LocationQuery::Coordinates {
                latitude,
                longitude,
            } => Ok(self.resolve_coordinates(*latitude, *longitude).await),
        }
    }

    /// Forward lookup. Failure is fatal: without coordinates there is no forecast.
    pub async fn resolve_place(&self, place_name: &str) -> Result<ResolvedLocation, AdvisoryError> {
        let key = place_cache_key(place_name);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(place = %place_name, "Geocoding cache hit");
            metrics::counter!("sowcast_geocode_cache_hits_total", "direction" => "forward")
                .increment(1);
            return Ok(cached);
        }

        tracing::debug!(place = %place_name, "Geocoding cache miss");

        let location = self
            .geocoder
            .search(place_name)
            .await
            .map_err(|e| AdvisoryError::GeocodeFailure(e.to_string()))?;

        tracing::info!(
            place = %place_name,
            name = %location.display_name,
            lat = %location.latitude,
            lon = %location.longitude,
            "Place name resolved"
        );

        self.cache.insert(key, location.clone());
        Ok(location)
    }

    /// Reverse lookup. Never fails: an unnamed location is still forecastable.
    pub async fn resolve_coordinates(&self, latitude: f64, longitude: f64) -> ResolvedLocation {
        let key = coordinate_cache_key(latitude, longitude);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(lat = %latitude, lon = %longitude, "Reverse geocoding cache hit");
            metrics::counter!("sowcast_geocode_cache_hits_total", "direction" => "reverse")
                .increment(1);
            return ResolvedLocation {
                latitude,
                longitude,
                display_name: cached.display_name,
            };
        }

        match self.geocoder.reverse(latitude, longitude).await {
            Ok(location) => {
                self.cache.insert(key, location.clone());
                location
            }
            Err(e) => {
                log_error(&AdvisoryError::ReverseGeocodeFailure(e.to_string()));
                ResolvedLocation::unnamed(latitude, longitude)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_geo_cache;
    use crate::test_support::{direct_client, CannedUpstream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Geocoder that knows exactly one place and counts upstream calls
    struct FakeGeocoder {
        reverse_fails: bool,
        calls: AtomicUsize,
    }

    impl FakeGeocoder {
        fn new(reverse_fails: bool) -> Arc<Self> {
            Arc::new(Self {
                reverse_fails,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn search(&self, place_name: &str) -> Result<ResolvedLocation, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if place_name == "New Delhi" {
                Ok(ResolvedLocation {
                    latitude: 28.6139,
                    longitude: 77.209,
                    display_name: "New Delhi".to_string(),
                })
            } else {
                Err(GeocodeError::LocationNotFound(place_name.to_string()))
            }
        }

        async fn reverse(
            &self,
            latitude: f64,
            longitude: f64,
        ) -> Result<ResolvedLocation, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reverse_fails {
                Err(GeocodeError::ApiError("HTTP 503".to_string()))
            } else {
                Ok(ResolvedLocation {
                    latitude,
                    longitude,
                    display_name: "Delhi".to_string(),
                })
            }
        }
    }

    fn resolver(geocoder: Arc<FakeGeocoder>) -> LocationResolver {
        LocationResolver::new(geocoder, create_geo_cache(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_resolve_place() {
        let geocoder = FakeGeocoder::new(false);
        let resolver = resolver(geocoder.clone());

        let location = resolver
            .resolve(&LocationQuery::place("New Delhi"))
            .await
            .unwrap();
        assert_eq!(location.display_name, "New Delhi");
        assert_eq!(location.latitude, 28.6139);
    }

    #[tokio::test]
    async fn test_resolve_place_failure_is_fatal() {
        let resolver = resolver(FakeGeocoder::new(false));

        let err = resolver
            .resolve(&LocationQuery::place("⟡invalid⟡"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisoryError::GeocodeFailure(_)));
    }

    #[tokio::test]
    async fn test_resolve_place_is_cached() {
        let geocoder = FakeGeocoder::new(false);
        let resolver = resolver(geocoder.clone());

        resolver.resolve_place("New Delhi").await.unwrap();
        resolver.resolve_place("  new delhi ").await.unwrap();
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_place_is_not_cached() {
        let geocoder = FakeGeocoder::new(false);
        let resolver = resolver(geocoder.clone());

        assert!(resolver.resolve_place("Nowhere").await.is_err());
        assert!(resolver.resolve_place("Nowhere").await.is_err());
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_coordinates() {
        let resolver = resolver(FakeGeocoder::new(false));

        let location = resolver
            .resolve(&LocationQuery::coordinates(28.6139, 77.2090))
            .await
            .unwrap();
        assert_eq!(location.display_name, "Delhi");
        assert_eq!(location.latitude, 28.6139);
        assert_eq!(location.longitude, 77.2090);
    }

    #[tokio::test]
    async fn test_reverse_failure_degrades_to_unknown() {
        let resolver = resolver(FakeGeocoder::new(true));

        let location = resolver
            .resolve(&LocationQuery::coordinates(28.6139, 77.2090))
            .await
            .unwrap();
        assert_eq!(location.display_name, UNKNOWN_LOCATION);
        assert_eq!(location.latitude, 28.6139);
        assert_eq!(location.longitude, 77.2090);
    }

    #[tokio::test]
    async fn test_reverse_cache_keeps_exact_coordinates() {
        let geocoder = FakeGeocoder::new(false);
        let resolver = resolver(geocoder.clone());

        resolver.resolve_coordinates(28.61391, 77.20901).await;
        let location = resolver.resolve_coordinates(28.613912, 77.209012).await;

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(location.display_name, "Delhi");
        assert_eq!(location.latitude, 28.613912);
    }

    #[test]
    fn test_nominatim_client_trims_base_url() {
        let client = NominatimClient::new(
            Client::new(),
            "https://nominatim.openstreetmap.org/",
            "sowcast/test",
            "en",
        );
        assert_eq!(client.base_url, "https://nominatim.openstreetmap.org");
        assert_eq!(client.user_agent, "sowcast/test");
    }

    fn nominatim(upstream: &CannedUpstream) -> NominatimClient {
        NominatimClient::new(direct_client(), &upstream.url, "sowcast/test", "de")
    }

    #[tokio::test]
    async fn test_search_sends_identity_and_parses_place() {
        let upstream = CannedUpstream::start(
            200,
            r#"[{"lat":"52.5170365","lon":"13.3888599","display_name":"Berlin, Deutschland",
                "address":{"city":"Berlin","state":"Berlin"}}]"#,
        )
        .await;

        let location = nominatim(&upstream).search("Berlin").await.unwrap();
        assert_eq!(location.display_name, "Berlin");
        assert_eq!(location.latitude, 52.5170365);
        assert_eq!(location.longitude, 13.3888599);

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.starts_with("get /search?"), "{}", request);
        assert!(request.contains("q=berlin"));
        assert!(request.contains("limit=1"));
        assert!(request.contains("addressdetails=1"));
        assert!(request.contains("format=json"));
        assert!(request.contains("accept-language=de"));
        assert!(request.contains("\r\nuser-agent: sowcast/test\r\n"));
    }

    #[tokio::test]
    async fn test_search_empty_result_is_not_found() {
        let upstream = CannedUpstream::start(200, "[]").await;

        let err = nominatim(&upstream).search("Atlantis").await.unwrap_err();
        assert!(matches!(err, GeocodeError::LocationNotFound(ref name) if name == "Atlantis"));
    }

    #[tokio::test]
    async fn test_search_error_status_is_api_error() {
        let upstream = CannedUpstream::start(503, r#"{"message":"busy"}"#).await;

        let err = nominatim(&upstream).search("Berlin").await.unwrap_err();
        match err {
            GeocodeError::ApiError(message) => assert!(message.starts_with("HTTP 503")),
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_garbage_body_is_invalid_response() {
        let upstream = CannedUpstream::start(200, "<html>maintenance</html>").await;

        let err = nominatim(&upstream).search("Berlin").await.unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_search_unparseable_coordinates() {
        let upstream =
            CannedUpstream::start(200, r#"[{"lat":"north","lon":"13.4","address":{}}]"#).await;

        let err = nominatim(&upstream).search("Berlin").await.unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_reverse_keeps_requested_coordinates() {
        let upstream = CannedUpstream::start(
            200,
            r#"{"lat":"52.5200066","lon":"13.404954","display_name":"Mitte, Berlin",
                "address":{"town":"Mitte","state":"Berlin"}}"#,
        )
        .await;

        let location = nominatim(&upstream).reverse(52.52, 13.405).await.unwrap();
        assert_eq!(location.display_name, "Mitte");
        assert_eq!(location.latitude, 52.52);
        assert_eq!(location.longitude, 13.405);

        let request = &upstream.requests()[0];
        assert!(request.starts_with("get /reverse?"), "{}", request);
        assert!(request.contains("lat=52.52"));
        assert!(request.contains("lon=13.405"));
        assert!(request.contains("accept-language=de"));
        assert!(request.contains("\r\nuser-agent: sowcast/test\r\n"));
    }

    #[tokio::test]
    async fn test_reverse_error_body_is_not_found() {
        let upstream = CannedUpstream::start(200, r#"{"error":"Unable to geocode"}"#).await;

        let err = nominatim(&upstream).reverse(0.0, -30.0).await.unwrap_err();
        assert!(matches!(err, GeocodeError::LocationNotFound(ref msg) if msg == "Unable to geocode"));
    }

    #[tokio::test]
    async fn test_reverse_error_status_is_api_error() {
        let upstream = CannedUpstream::start(429, "{}").await;

        let err = nominatim(&upstream).reverse(52.52, 13.405).await.unwrap_err();
        assert!(matches!(err, GeocodeError::ApiError(_)));
    }
}
