//! Failure reporting
//!
//! Turns a relay error into an HTTP response. Only valid while nothing has
//! been committed to the client yet.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{RelayError, RelayErrorKind};

impl RelayError {
    /// HTTP status reported for this error
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            RelayErrorKind::ClientInput => StatusCode::BAD_REQUEST,
            RelayErrorKind::ResourceAcquisition
            | RelayErrorKind::Timeout
            | RelayErrorKind::ProtocolDecode
            | RelayErrorKind::UpstreamRead
            | RelayErrorKind::DownstreamWrite => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Status plus plain-text description
pub fn failure_response(error: &RelayError) -> Response {
    (error.status(), error.to_string()).into_response()
}
