//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the demo JSON application
//! - Wire up middleware (LLSD transcoding, tracing)
//! - Bind server to listener and stop on the shutdown signal
//!
//! # Routes
//! ```text
//! GET  /hello   {"message": "Hello, world!"} as JSON
//! POST /echo    echoes a JSON body back
//! GET  /text    plain text, never transcoded
//! GET  /llsd    a body that is already LLSD XML, never transcoded
//! ```

use std::future::Future;

use axum::{
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::http::LlsdLayer;
use crate::transcode::Format;

/// HTTP server for the transcoding demo.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let router = Self::build_router(&config);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(config: &AppConfig) -> Router {
        Router::new()
            .route("/hello", get(hello))
            .route("/echo", post(echo))
            .route("/text", get(text))
            .route("/llsd", get(llsd))
            .layer(LlsdLayer::from_config(&config.transcoder))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` resolves, then drain open connections.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            quirks = self.config.transcoder.quirks,
            max_body_size = self.config.transcoder.max_body_size,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello, world!" }))
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn text() -> &'static str {
    "Hello, world!"
}

async fn llsd() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, Format::Xml.mime())],
        "<?xml version=\"1.0\" ?><llsd><string>already LLSD</string></llsd>",
    )
}
