// crates/wrapper/src/error.rs
//! Gateway failure taxonomy and its HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use coach_types::IdentityError;
use serde::Serialize;
use thiserror::Error;

pub const AGENT: &str = "agent runtime";
pub const BACKEND: &str = "coach backend";
pub const TTS: &str = "text-to-speech";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not reach {service}: {message}")]
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned {status}: {body}")]
    UpstreamRejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("unexpected payload from {service}: {message}")]
    Protocol {
        service: &'static str,
        message: String,
    },

    /// The browser went away; expected on every stream teardown.
    #[error("client disconnected")]
    ClientDisconnected,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn unavailable(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable {
            service,
            message: err.to_string(),
        }
    }

    pub fn protocol(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Protocol {
            service,
            message: err.to_string(),
        }
    }

    /// Classify a transport-level failure.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::protocol(service, err)
        } else {
            Self::unavailable(service, err)
        }
    }

    /// Turn a non-success response into `UpstreamRejected`, keeping its body.
    pub async fn rejected(service: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Self::UpstreamRejected {
            service,
            status,
            body,
        }
    }
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] IdentityError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }
            ApiError::Unauthorized(err) => {
                tracing::warn!(error = %err, "Identity resolution failed");
                (StatusCode::UNAUTHORIZED, err.to_string(), None)
            }
            ApiError::Gateway(GatewayError::Internal(msg)) => {
                tracing::error!(message = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            ApiError::Gateway(GatewayError::ClientDisconnected) => {
                tracing::debug!("Client disconnected");
                (StatusCode::BAD_REQUEST, "Client disconnected".to_string(), None)
            }
            ApiError::Gateway(err) => {
                tracing::error!(error = %err, "Upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream service failure".to_string(),
                    Some(err.to_string()),
                )
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn upstream_errors_are_bad_gateway_with_details() {
        let err = GatewayError::UpstreamRejected {
            service: AGENT,
            status: 503,
            body: "overloaded".into(),
        };
        let (status, body) = extract_response(ApiError::from(err).into_response()).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "Upstream service failure");
        assert_eq!(
            body.details.as_deref(),
            Some("agent runtime returned 503: overloaded")
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let err = GatewayError::Internal("serializer exploded".into());
        let (status, body) = extract_response(ApiError::from(err).into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn identity_errors_are_unauthorized() {
        let (status, _) =
            extract_response(ApiError::from(IdentityError::Missing).into_response()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
