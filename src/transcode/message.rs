//! The message protocol between a server, the transcoder and an application.
//!
//! ```text
//! server ──RequestBody*──▶ transcoder ──RequestBody*──▶ application
//! server ◀─ResponseStart── transcoder ◀─ResponseStart── application
//! server ◀─ResponseBody*── transcoder ◀─ResponseBody*── application
//! ```
//!
//! A body is delivered as one or more `*Body` messages; `more_body` is set on
//! every chunk except the last.

use std::collections::VecDeque;
use std::future::Future;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

use super::TranscodeError;

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    RequestBody { body: Bytes, more_body: bool },
    ResponseStart { status: StatusCode, headers: HeaderMap },
    ResponseBody { body: Bytes, more_body: bool },
    /// The client went away.
    Disconnect,
}

impl Message {
    pub fn request_body(body: impl Into<Bytes>) -> Self {
        Message::RequestBody {
            body: body.into(),
            more_body: false,
        }
    }

    pub fn response_body(body: impl Into<Bytes>) -> Self {
        Message::ResponseBody {
            body: body.into(),
            more_body: false,
        }
    }
}

/// Where inbound messages come from. Each call suspends until one is ready.
pub trait MessageSource: Send {
    fn receive(&mut self) -> impl Future<Output = Result<Message, TranscodeError>> + Send;
}

/// Where outbound messages go.
pub trait MessageSink: Send {
    fn send(&mut self, message: Message) -> impl Future<Output = Result<(), TranscodeError>> + Send;
}

impl<T: MessageSource + ?Sized> MessageSource for &mut T {
    fn receive(&mut self) -> impl Future<Output = Result<Message, TranscodeError>> + Send {
        (**self).receive()
    }
}

impl<T: MessageSink + ?Sized> MessageSink for &mut T {
    fn send(&mut self, message: Message) -> impl Future<Output = Result<(), TranscodeError>> + Send {
        (**self).send(message)
    }
}

/// Placeholder transport of an exchange that has not been attached yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattached;

impl MessageSource for Unattached {
    async fn receive(&mut self) -> Result<Message, TranscodeError> {
        Err(TranscodeError::Unattached("receive"))
    }
}

impl MessageSink for Unattached {
    async fn send(&mut self, _message: Message) -> Result<(), TranscodeError> {
        Err(TranscodeError::Unattached("send"))
    }
}

/// In-memory transport: replays queued inbound messages and records
/// everything sent. Once the queue is empty it reports a disconnect.
#[derive(Debug, Default)]
pub struct Buffered {
    inbound: VecDeque<Message>,
    sent: Vec<Message>,
}

impl Buffered {
    pub fn new(inbound: impl IntoIterator<Item = Message>) -> Self {
        Self {
            inbound: inbound.into_iter().collect(),
            sent: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[Message] {
        &self.sent
    }

    pub fn into_sent(self) -> Vec<Message> {
        self.sent
    }
}

impl MessageSource for Buffered {
    async fn receive(&mut self) -> Result<Message, TranscodeError> {
        Ok(self.inbound.pop_front().unwrap_or(Message::Disconnect))
    }
}

impl MessageSink for Buffered {
    async fn send(&mut self, message: Message) -> Result<(), TranscodeError> {
        self.sent.push(message);
        Ok(())
    }
}
