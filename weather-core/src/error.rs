use thiserror::Error;

use crate::provider::ProviderId;

/// Failures of the forecast endpoint.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("latitude and longitude are required")]
    MissingParameter,

    #[error("latitude and longitude must be numbers")]
    InvalidParameter,

    #[error("no weather provider or API key configured")]
    NotConfigured,

    #[error("unsupported weather provider '{0}'")]
    UnsupportedProvider(String),

    #[error("{provider} request failed: {reason}")]
    UpstreamFetchFailed { provider: ProviderId, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ForecastError {
    pub fn upstream(provider: ProviderId, reason: impl Into<String>) -> Self {
        ForecastError::UpstreamFetchFailed { provider, reason: reason.into() }
    }

    /// Message returned to HTTP callers in the `error` field.
    pub fn public_message(&self) -> &'static str {
        match self {
            ForecastError::MissingParameter => "Latitude and longitude are required",
            ForecastError::InvalidParameter => "Latitude and longitude must be numbers",
            ForecastError::NotConfigured => "Weather API not configured",
            ForecastError::UnsupportedProvider(_) => "Unsupported weather provider",
            ForecastError::UpstreamFetchFailed { .. } | ForecastError::Internal(_) => {
                "Failed to fetch weather data"
            }
        }
    }
}

/// Failures seen by the client-side weather store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Location access denied")]
    GeolocationDenied,

    #[error("Geolocation is not supported")]
    GeolocationUnavailable,

    #[error("{0}")]
    FetchFailed(String),
}
