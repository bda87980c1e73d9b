//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! negotiator / exchange / http layer
//!     → tracing events with structured fields
//!     → logging.rs (EnvFilter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - Request spans come from tower-http's `TraceLayer`

pub mod logging;
