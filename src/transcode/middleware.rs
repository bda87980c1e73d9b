//! Message-level middleware.
//!
//! For servers that speak the [`Message`](super::Message) protocol
//! directly: every HTTP exchange gets its own [`Exchange`] wrapped around
//! the server's transport, and the application talks to that instead.
//!
//! ```text
//! server ──Scope::Http──▶ LlsdMiddleware ──Scope::Http (JSON headers)──▶ app
//!           transport ◀──────── Exchange ◀──────── app.receive / app.send
//! ```

use std::future::Future;

use axum::http::request::Parts;

use super::exchange::Exchange;
use super::message::{MessageSink, MessageSource};
use super::negotiate::Negotiator;
use super::TranscodeError;

/// What a call is about.
#[derive(Debug)]
pub enum Scope {
    /// One request/response cycle. The body travels as messages.
    Http(Parts),
    /// Startup/shutdown events; never transcoded.
    Lifespan,
}

/// An application driven by messages.
pub trait App: Send + Sync {
    fn call<T>(
        &self,
        scope: Scope,
        transport: &mut T,
    ) -> impl Future<Output = Result<(), TranscodeError>> + Send
    where
        T: MessageSource + MessageSink;
}

/// Wraps an [`App`] so it only ever sees JSON bodies.
#[derive(Debug, Clone)]
pub struct LlsdMiddleware<A> {
    app: A,
    negotiator: Negotiator,
}

impl<A: App> LlsdMiddleware<A> {
    pub fn new(app: A, quirks: bool) -> Self {
        Self {
            app,
            negotiator: Negotiator::new(quirks),
        }
    }

    pub fn inner(&self) -> &A {
        &self.app
    }
}

impl<A: App> App for LlsdMiddleware<A> {
    async fn call<T>(&self, scope: Scope, transport: &mut T) -> Result<(), TranscodeError>
    where
        T: MessageSource + MessageSink,
    {
        let mut parts = match scope {
            Scope::Http(parts) => parts,
            other => return self.app.call(other, transport).await,
        };

        let negotiation = self.negotiator.negotiate(&parts.headers);
        parts.headers = negotiation.request_headers(&parts.headers);

        let mut exchange = Exchange::new(negotiation).attach(&mut *transport);
        self.app.call(Scope::Http(parts), &mut exchange).await
    }
}
