//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//!
//! ```toml
//! [listener]
//! bind_address = "127.0.0.1:8080"
//!
//! [transcoder]
//! quirks = true
//! max_body_size = 2097152
//!
//! [observability]
//! log_level = "debug"
//! ```

use serde::{Deserialize, Serialize};

/// Root configuration for the transcoding server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// LLSD negotiation and body handling.
    pub transcoder: TranscoderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Answer clients that did not ask for a specific type with LLSD XML.
    pub quirks: bool,

    /// Largest request or response body (bytes) buffered for transcoding.
    pub max_body_size: usize,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            quirks: false,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
