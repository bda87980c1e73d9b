//! LLSD transcoding as a tower layer.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → Negotiator (content-type / accept)
//!     → [Frames → Exchange::receive_next_message → JSON body]
//!     → inner service
//!     → [Frames → Exchange::send_next_message → LLSD body]
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - A direction that negotiated to inactive never touches its body, so
//!   streaming requests and responses keep streaming
//! - A response is only buffered once its `Content-Type` says JSON
//! - A body of known length is one message no matter how many frames it
//!   arrived in; only bodies of unknown length count as streamed
//! - Failures become plain-text responses (see `response.rs`)

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderValue, CONTENT_LENGTH};
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service, ServiceExt};

use super::body::{Frames, HttpTransport};
use crate::config::TranscoderConfig;
use crate::transcode::headers::with_overrides;
use crate::transcode::{Exchange, InboundMode, Message, Negotiator, TranscodeError};

/// Adds LLSD transcoding to a service that speaks JSON.
#[derive(Debug, Clone, Copy)]
pub struct LlsdLayer {
    negotiator: Negotiator,
    max_body_size: usize,
}

impl LlsdLayer {
    pub fn new(quirks: bool) -> Self {
        Self {
            negotiator: Negotiator::new(quirks),
            max_body_size: TranscoderConfig::default().max_body_size,
        }
    }

    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self {
            negotiator: Negotiator::new(config.quirks),
            max_body_size: config.max_body_size,
        }
    }

    /// Largest body, in bytes, buffered in either direction.
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }
}

impl<S> Layer<S> for LlsdLayer {
    type Service = LlsdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LlsdService {
            inner,
            negotiator: self.negotiator,
            max_body_size: self.max_body_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlsdService<S> {
    inner: S,
    negotiator: Negotiator,
    max_body_size: usize,
}

impl<S> Service<Request<Body>> for LlsdService<S>
where
    S: Service<Request<Body>, Response = Response<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // The clone that was polled ready is the one that handles this request.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let negotiator = self.negotiator;
        let limit = self.max_body_size;

        Box::pin(async move {
            Ok(transcode(inner, negotiator, limit, request)
                .await
                .unwrap_or_else(IntoResponse::into_response))
        })
    }
}

async fn transcode<S>(
    inner: S,
    negotiator: Negotiator,
    limit: usize,
    request: Request<Body>,
) -> Result<Response<Body>, TranscodeError>
where
    S: Service<Request<Body>, Response = Response<Body>, Error = Infallible>,
{
    let (mut parts, body) = request.into_parts();
    let negotiation = negotiator.negotiate(&parts.headers);
    parts.headers = negotiation.request_headers(&parts.headers);

    let decoding = matches!(negotiation.inbound, InboundMode::Decode(_));
    if !decoding && !negotiation.outbound.is_active() {
        return Ok(call_ready(inner, Request::from_parts(parts, body)).await);
    }

    let (transport, passthrough) = if decoding {
        (HttpTransport::new(Frames::new(body, limit)), None)
    } else {
        (HttpTransport::outbound_only(), Some(body))
    };
    let mut exchange = Exchange::new(negotiation).attach(transport);

    let request_body = match passthrough {
        Some(body) => body,
        None => match exchange.receive_next_message().await? {
            Message::RequestBody { body, .. } => {
                parts.headers = with_overrides(
                    &parts.headers,
                    [(CONTENT_LENGTH, HeaderValue::from(body.len()))],
                );
                Body::from(body)
            }
            _ => return Err(TranscodeError::UnexpectedMessage("client left before sending a body")),
        },
    };

    let response = call_ready(inner, Request::from_parts(parts, request_body)).await;
    if !exchange.outbound().is_active() {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    exchange
        .send_next_message(Message::ResponseStart {
            status: parts.status,
            headers: parts.headers.clone(),
        })
        .await?;
    if !exchange.outbound().is_active() {
        return Ok(Response::from_parts(parts, body));
    }

    let mut frames = Frames::new(body, limit);
    while let Some((chunk, more_body)) = frames.next_chunk().await? {
        exchange
            .send_next_message(Message::ResponseBody {
                body: chunk,
                more_body,
            })
            .await?;
    }

    let mut start = None;
    let mut encoded = Bytes::new();
    for message in exchange.into_transport().into_sent() {
        match message {
            Message::ResponseStart { status, headers } => start = Some((status, headers)),
            Message::ResponseBody { body, .. } => encoded = body,
            _ => {}
        }
    }
    let (status, headers) =
        start.ok_or(TranscodeError::UnexpectedMessage("response finished without a start"))?;

    let mut parts = parts;
    parts.status = status;
    parts.headers = headers;
    Ok(Response::from_parts(parts, Body::from(encoded)))
}

async fn call_ready<S>(inner: S, request: Request<Body>) -> Response<Body>
where
    S: Service<Request<Body>, Response = Response<Body>, Error = Infallible>,
{
    match inner.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
