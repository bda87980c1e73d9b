//! Failures of a transcoded exchange.

use std::fmt;

use crate::llsd;

use super::Format;

/// Which side of the exchange a body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => f.write_str("request"),
            Direction::Response => f.write_str("response"),
        }
    }
}

/// Every failure aborts the exchange; none is retried.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    /// The body arrived as more than one non-empty chunk.
    #[error("streaming the {0} body isn't supported")]
    UnsupportedStreaming(Direction),

    #[error("malformed LLSD {format} body: {source}")]
    Decode {
        format: Format,
        #[source]
        source: llsd::Error,
    },

    #[error("malformed JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("cannot encode {0} as JSON")]
    Encode(String),

    /// receive or send was used before the exchange was attached to a transport.
    #[error("{0} awaitable not set")]
    Unattached(&'static str),

    #[error("unexpected message: {0}")]
    UnexpectedMessage(&'static str),

    #[error("body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },

    #[error("transport error: {0}")]
    Transport(String),
}

impl TranscodeError {
    /// Whether the failure was caused by what the client sent.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TranscodeError::Decode { .. }
                | TranscodeError::UnsupportedStreaming(Direction::Request)
                | TranscodeError::BodyTooLarge { .. }
        )
    }
}
