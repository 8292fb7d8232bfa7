//! Error types shared by the gateway, the stores and the audio layer

use thiserror::Error;

/// Failures reported by a [`crate::gateway::RemoteDataGateway`] call.
///
/// Cloneable so a single failed prefetch can be observed by every search
/// waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// An id or uri could not be turned into a catalog id
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// The catalog client reported an error
    #[error("Spotify API error: {0}")]
    Api(String),
}

impl GatewayError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            GatewayError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Network(err.to_string())
        }
    }
}

impl From<rspotify::ClientError> for GatewayError {
    fn from(err: rspotify::ClientError) -> Self {
        GatewayError::Api(err.to_string())
    }
}

impl From<rspotify::model::IdError> for GatewayError {
    fn from(err: rspotify::model::IdError) -> Self {
        GatewayError::InvalidId(err.to_string())
    }
}

/// Failures while loading or playing a preview.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("Failed to fetch preview: {0}")]
    Fetch(String),

    #[error("Failed to decode preview: {0}")]
    Decode(String),

    #[error("No output device available")]
    DeviceNotFound,

    #[error("Audio stream error: {0}")]
    Stream(String),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
