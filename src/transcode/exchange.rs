//! Per-exchange message rewriting.
//!
//! # Data Flow
//! ```text
//! inbound:   transport.receive() → [decode LLSD → JSON] → application
//! outbound:  application → ResponseStart (held) → ResponseBody
//!                → [JSON → encode LLSD] → ResponseStart' + ResponseBody' → transport.send()
//! ```
//!
//! # Design Decisions
//! - The response start is held back for exactly one message: its
//!   `Content-Type` and `Content-Length` depend on the encoded body
//! - A response that does not declare JSON revokes encoding and is
//!   forwarded verbatim, so already-LLSD responses pass through
//! - Bodies must arrive in one chunk; the only tolerated extra chunk is an
//!   empty terminal request chunk

use axum::body::Bytes;
use axum::http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};

use super::headers::{is_json, with_overrides};
use super::message::{Message, MessageSink, MessageSource, Unattached};
use super::negotiate::{InboundMode, Negotiation, OutboundMode};
use super::{json, Direction, TranscodeError};

/// State of one request/response cycle, wrapping its transport.
#[derive(Debug)]
pub struct Exchange<T = Unattached> {
    inbound: InboundMode,
    outbound: OutboundMode,
    pending_start: Option<(StatusCode, HeaderMap)>,
    transport: T,
}

impl Exchange {
    pub fn new(negotiation: Negotiation) -> Self {
        Self {
            inbound: negotiation.inbound,
            outbound: negotiation.outbound,
            pending_start: None,
            transport: Unattached,
        }
    }
}

impl<T> Exchange<T> {
    /// Bind the exchange to the transport it reads from and writes to.
    pub fn attach<U: MessageSource + MessageSink>(self, transport: U) -> Exchange<U> {
        Exchange {
            inbound: self.inbound,
            outbound: self.outbound,
            pending_start: self.pending_start,
            transport,
        }
    }

    pub fn inbound(&self) -> InboundMode {
        self.inbound
    }

    pub fn outbound(&self) -> &OutboundMode {
        &self.outbound
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T: MessageSource + MessageSink> Exchange<T> {
    /// Pull the next inbound message, decoding an LLSD body into JSON.
    pub async fn receive_next_message(&mut self) -> Result<Message, TranscodeError> {
        let message = self.transport.receive().await?;
        let InboundMode::Decode(format) = self.inbound else {
            return Ok(message);
        };

        let (body, more_body) = match message {
            Message::RequestBody { body, more_body } => (body, more_body),
            Message::Disconnect => return Ok(Message::Disconnect),
            _ => return Err(TranscodeError::UnexpectedMessage("expected a request body")),
        };

        if more_body {
            // Some clients finish a body with one extra empty chunk. Anything
            // else means the body is being streamed.
            match self.transport.receive().await? {
                Message::RequestBody {
                    body: tail,
                    more_body: false,
                } if tail.is_empty() => {}
                Message::Disconnect => return Ok(Message::Disconnect),
                _ => {
                    tracing::warn!(format = %format, "Rejected streamed request body");
                    return Err(TranscodeError::UnsupportedStreaming(Direction::Request));
                }
            }
        }

        let value = format
            .decode(&body)
            .map_err(|source| TranscodeError::Decode { format, source })?;
        let decoded = json::encode(&value)?;

        tracing::debug!(
            format = %format,
            llsd_bytes = body.len(),
            json_bytes = decoded.len(),
            "Decoded request body"
        );

        Ok(Message::RequestBody {
            body: Bytes::from(decoded),
            more_body: false,
        })
    }

    /// Emit an outbound message, encoding a JSON response body as LLSD.
    pub async fn send_next_message(&mut self, message: Message) -> Result<(), TranscodeError> {
        let (format, content_type) = match &self.outbound {
            OutboundMode::Encode {
                format,
                content_type,
            } => (*format, content_type.clone()),
            OutboundMode::Inactive => return self.transport.send(message).await,
        };

        match message {
            Message::ResponseStart { status, headers } => {
                if self.pending_start.is_some() {
                    return Err(TranscodeError::UnexpectedMessage("second response start"));
                }
                if !is_json(&headers) {
                    tracing::debug!(
                        format = %format,
                        content_type = ?headers.get(CONTENT_TYPE),
                        "Response is not JSON, passing it through"
                    );
                    self.outbound = OutboundMode::Inactive;
                    return self
                        .transport
                        .send(Message::ResponseStart { status, headers })
                        .await;
                }
                self.pending_start = Some((status, headers));
                Ok(())
            }
            Message::ResponseBody { body, more_body } => {
                if more_body {
                    tracing::warn!(format = %format, "Rejected streamed response body");
                    return Err(TranscodeError::UnsupportedStreaming(Direction::Response));
                }
                let (status, headers) = self
                    .pending_start
                    .take()
                    .ok_or(TranscodeError::UnexpectedMessage("response body before response start"))?;

                let value = json::decode(&body)?;
                let encoded = format.encode(&value);
                let mut headers =
                    with_overrides(&headers, [(CONTENT_LENGTH, HeaderValue::from(encoded.len()))]);
                match content_type {
                    Some(content_type) => {
                        headers.insert(CONTENT_TYPE, content_type);
                    }
                    None => {
                        headers.remove(CONTENT_TYPE);
                    }
                }

                tracing::debug!(
                    format = %format,
                    json_bytes = body.len(),
                    llsd_bytes = encoded.len(),
                    "Encoded response body"
                );

                self.transport
                    .send(Message::ResponseStart { status, headers })
                    .await?;
                self.transport
                    .send(Message::ResponseBody {
                        body: Bytes::from(encoded),
                        more_body: false,
                    })
                    .await
            }
            other => self.transport.send(other).await,
        }
    }
}

impl<T: MessageSource + MessageSink> MessageSource for Exchange<T> {
    async fn receive(&mut self) -> Result<Message, TranscodeError> {
        self.receive_next_message().await
    }
}

impl<T: MessageSource + MessageSink> MessageSink for Exchange<T> {
    async fn send(&mut self, message: Message) -> Result<(), TranscodeError> {
        self.send_next_message(message).await
    }
}
