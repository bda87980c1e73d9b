//! Transcoding failures as HTTP responses.
//!
//! # Design Decisions
//! - Error responses are plain text and bypass transcoding
//! - Client faults are logged at `warn`, everything else at `error`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::transcode::TranscodeError;

impl TranscodeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TranscodeError::Decode { .. } => StatusCode::BAD_REQUEST,
            TranscodeError::UnsupportedStreaming(_) => StatusCode::NOT_IMPLEMENTED,
            TranscodeError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            TranscodeError::InvalidJson(_)
            | TranscodeError::Encode(_)
            | TranscodeError::Unattached(_)
            | TranscodeError::UnexpectedMessage(_)
            | TranscodeError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TranscodeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Rejected LLSD exchange");
        } else {
            tracing::error!(status = status.as_u16(), error = %self, "LLSD transcoding failed");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llsd;
    use crate::transcode::{Direction, Format};

    #[test]
    fn test_status_mapping() {
        let decode = TranscodeError::Decode {
            format: Format::Xml,
            source: llsd::Error::Eof(0),
        };
        assert_eq!(decode.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            TranscodeError::UnsupportedStreaming(Direction::Response).status_code(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            TranscodeError::BodyTooLarge { limit: 1 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            TranscodeError::Encode("real NaN".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response() {
        let response = TranscodeError::UnsupportedStreaming(Direction::Request).into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
    }
}
