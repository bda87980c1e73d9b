//! HTTP adapter subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, demo routes)
//!     → layer.rs (negotiate, transcode request body)
//!     → JSON handlers
//!     → layer.rs (transcode response body)
//!     → Send to client
//! ```

pub mod body;
pub mod layer;
pub mod response;
pub mod server;

pub use layer::{LlsdLayer, LlsdService};
pub use server::HttpServer;
