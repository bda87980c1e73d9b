//! Body frames as messages.
//!
//! # Responsibilities
//! - Read an HTTP body frame by frame, looking one frame ahead so each
//!   chunk knows whether more follow
//! - Enforce the configured body limit while reading
//! - Act as the transport of an [`Exchange`](crate::transcode::Exchange)
//!   inside the tower layer
//!
//! # Design Decisions
//! - A body whose length is known up front (`Content-Length`, or a body
//!   built from bytes) is read whole and reaches the exchange as one chunk,
//!   however the connection split it into frames
//! - A body of unknown length is passed on frame by frame, so a streamed
//!   body reaches the exchange as a multi-chunk body
//! - An empty body still yields one (empty, terminal) chunk, so the
//!   exchange always sees exactly one final body message

use axum::body::{Body, BodyDataStream, Bytes, HttpBody};
use futures_util::stream::{Peekable, StreamExt};
use std::pin::Pin;

use crate::transcode::{Message, MessageSink, MessageSource, TranscodeError};

/// Lookahead reader over the data frames of a body.
pub struct Frames {
    stream: Peekable<BodyDataStream>,
    limit: usize,
    /// Declared length of the whole body, when known.
    length: Option<u64>,
    received: usize,
    started: bool,
    done: bool,
}

impl Frames {
    pub fn new(body: Body, limit: usize) -> Self {
        let length = body.size_hint().exact();
        Self {
            stream: body.into_data_stream().peekable(),
            limit,
            length,
            received: 0,
            started: false,
            done: false,
        }
    }

    /// The next chunk and whether more chunks follow it, or `None` once the
    /// body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<(Bytes, bool)>, TranscodeError> {
        if self.done {
            return Ok(None);
        }
        if let Some(length) = self.length {
            self.done = true;
            return self.whole(length).await.map(|body| Some((body, false)));
        }

        let chunk = match self.stream.next().await {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                self.done = true;
                return Err(TranscodeError::Transport(e.to_string()));
            }
            None => {
                self.done = true;
                return Ok((!self.started).then_some((Bytes::new(), false)));
            }
        };
        self.started = true;

        self.received += chunk.len();
        if self.received > self.limit {
            self.done = true;
            return Err(TranscodeError::BodyTooLarge { limit: self.limit });
        }

        let more = Pin::new(&mut self.stream).peek().await.is_some();
        self.done = !more;
        Ok(Some((chunk, more)))
    }

    /// Collect every frame of a body declared to be `length` bytes long.
    async fn whole(&mut self, length: u64) -> Result<Bytes, TranscodeError> {
        let limit = self.limit;
        let too_large = || TranscodeError::BodyTooLarge { limit };
        let length = usize::try_from(length).map_err(|_| too_large())?;
        if length > limit {
            return Err(too_large());
        }

        let mut body = Vec::with_capacity(length);
        while let Some(frame) = self.stream.next().await {
            let frame = frame.map_err(|e| TranscodeError::Transport(e.to_string()))?;
            if body.len() + frame.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&frame);
        }
        Ok(Bytes::from(body))
    }
}

/// Transport of one exchange inside the tower layer.
///
/// Request frames are the inbound messages; outbound messages are recorded
/// so the layer can rebuild the response from them.
#[derive(Default)]
pub struct HttpTransport {
    request: Option<Frames>,
    sent: Vec<Message>,
}

impl HttpTransport {
    /// A transport that reads the given request body.
    pub fn new(request: Frames) -> Self {
        Self {
            request: Some(request),
            sent: Vec::new(),
        }
    }

    /// A transport with nothing to read; every receive reports a disconnect.
    pub fn outbound_only() -> Self {
        Self::default()
    }

    pub fn into_sent(self) -> Vec<Message> {
        self.sent
    }
}

impl MessageSource for HttpTransport {
    async fn receive(&mut self) -> Result<Message, TranscodeError> {
        let Some(frames) = self.request.as_mut() else {
            return Ok(Message::Disconnect);
        };
        Ok(match frames.next_chunk().await? {
            Some((body, more_body)) => Message::RequestBody { body, more_body },
            None => Message::Disconnect,
        })
    }
}

impl MessageSink for HttpTransport {
    async fn send(&mut self, message: Message) -> Result<(), TranscodeError> {
        self.sent.push(message);
        Ok(())
    }
}
