//! LLSD ⇄ JSON transcoding for request/response exchanges.
//!
//! # Responsibilities
//! - Negotiate, per exchange, whether the request body is decoded from LLSD
//!   and whether the response body is encoded into LLSD
//! - Rewrite the message stream between a server and an application so the
//!   application only ever sees JSON
//!
//! # Data Flow
//! ```text
//!              ┌──────────────┐   Negotiation   ┌───────────┐
//!  headers ───▶│  Negotiator  │────────────────▶│ Exchange  │
//!              └──────────────┘                 └─────┬─────┘
//!                                                     │
//!  server ◀──── MessageSource / MessageSink ─────────▶│◀────▶ application
//! ```
//!
//! `middleware` glues the pieces together for message-level servers;
//! `crate::http` does the same for tower services.

pub mod error;
pub mod exchange;
pub mod format;
pub mod headers;
pub mod json;
pub mod message;
pub mod middleware;
pub mod negotiate;

pub use error::{Direction, TranscodeError};
pub use exchange::Exchange;
pub use format::{Format, JSON_CONTENT_TYPE};
pub use message::{Buffered, Message, MessageSink, MessageSource, Unattached};
pub use middleware::{App, LlsdMiddleware, Scope};
pub use negotiate::{InboundMode, Negotiation, Negotiator, OutboundMode};
