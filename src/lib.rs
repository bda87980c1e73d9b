//! LLSD ⇄ JSON transcoding middleware library.

// Wire format
pub mod llsd;

// Core transcoding and adapters
pub mod convert;
pub mod http;
pub mod transcode;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::AppConfig;
pub use http::{HttpServer, LlsdLayer};
pub use lifecycle::Shutdown;
pub use transcode::{Format, LlsdMiddleware, Negotiator, TranscodeError};
