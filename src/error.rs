use serde::Serialize;
use thiserror::Error;

/// Classification of every failure the advisory engine can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Place name could not be turned into coordinates
    GeocodeFailure,
    /// Display name lookup failed for known coordinates
    ReverseGeocodeFailure,
    /// Forecast source failed or returned garbage
    UpstreamFailure,
    /// A completed request that was superseded by a newer one
    StaleResult,
    /// Query rejected before any network call
    InvalidQuery,
}

impl ErrorKind {
    /// Stable error code for programmatic handling (e.g., "GEOCODE_FAILURE")
    pub fn code(self) -> &'static str {
        match self {
            Self::GeocodeFailure => "GEOCODE_FAILURE",
            Self::ReverseGeocodeFailure => "REVERSE_GEOCODE_FAILURE",
            Self::UpstreamFailure => "UPSTREAM_FAILURE",
            Self::StaleResult => "STALE_RESULT",
            Self::InvalidQuery => "INVALID_QUERY",
        }
    }

    /// Whether this kind ends the request with a published `Failure`
    pub fn is_fatal(self) -> bool {
        match self {
            Self::GeocodeFailure | Self::UpstreamFailure | Self::InvalidQuery => true,
            Self::ReverseGeocodeFailure | Self::StaleResult => false,
        }
    }
}

/// Errors surfaced by the orchestrator boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvisoryError {
    #[error("Could not find location: {0}")]
    GeocodeFailure(String),

    #[error("Could not look up location name: {0}")]
    ReverseGeocodeFailure(String),

    #[error("Failed to fetch weather data: {0}")]
    UpstreamFailure(String),

    #[error("Invalid location query: {0}")]
    InvalidQuery(String),
}

impl AdvisoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GeocodeFailure(_) => ErrorKind::GeocodeFailure,
            Self::ReverseGeocodeFailure(_) => ErrorKind::ReverseGeocodeFailure,
            Self::UpstreamFailure(_) => ErrorKind::UpstreamFailure,
            Self::InvalidQuery(_) => ErrorKind::InvalidQuery,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}

/// Log an error with its kind and code attached
pub fn log_error(err: &AdvisoryError) {
    let message = err.to_string();
    let code = err.code();

    if err.is_fatal() {
        tracing::error!(error = %message, code = %code, "Weather request failed");
    } else {
        tracing::warn!(error = %message, code = %code, "Degraded weather result");
    }
}
