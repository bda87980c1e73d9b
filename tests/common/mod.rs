//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Request, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use llsd_transcoder::llsd::Value;
use llsd_transcoder::transcode::{App, Message, MessageSink, MessageSource, Scope, TranscodeError};
use llsd_transcoder::{AppConfig, HttpServer, Shutdown};

pub const JSON: &str = "application/json";

/// `{"message": "Hello, world!"}`
pub fn hello() -> Value {
    [("message", Value::from("Hello, world!"))].into_iter().collect()
}

pub const HELLO_JSON: &[u8] = br#"{"message":"Hello, world!"}"#;

/// Request head with the given headers.
pub fn parts(headers: &[(&'static str, &'static str)]) -> Parts {
    let mut builder = Request::builder().method("POST").uri("/");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    parts
}

pub fn json_headers(len: usize) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers
}

/// What an application saw of its request.
#[derive(Debug, Default, Clone)]
pub struct Observed {
    pub headers: Option<HeaderMap>,
    pub body: Vec<Message>,
    pub lifespan: bool,
}

/// Records what it receives, then answers with a fixed script of messages.
#[derive(Default)]
pub struct ScriptedApp {
    pub reply: Vec<Message>,
    pub observed: Mutex<Observed>,
}

impl ScriptedApp {
    pub fn new(reply: Vec<Message>) -> Self {
        Self {
            reply,
            observed: Mutex::default(),
        }
    }

    /// Replies with `body` as a single-chunk JSON response.
    pub fn json(body: &'static [u8]) -> Self {
        Self::new(vec![
            Message::ResponseStart {
                status: StatusCode::OK,
                headers: json_headers(body.len()),
            },
            Message::response_body(Bytes::from_static(body)),
        ])
    }

    pub async fn observed(&self) -> Observed {
        self.observed.lock().await.clone()
    }
}

impl App for ScriptedApp {
    async fn call<T>(&self, scope: Scope, transport: &mut T) -> Result<(), TranscodeError>
    where
        T: MessageSource + MessageSink,
    {
        match scope {
            Scope::Lifespan => {
                self.observed.lock().await.lifespan = true;
                return Ok(());
            }
            Scope::Http(parts) => self.observed.lock().await.headers = Some(parts.headers),
        }

        loop {
            let message = transport.receive().await?;
            let last = !matches!(message, Message::RequestBody { more_body: true, .. });
            self.observed.lock().await.body.push(message);
            if last {
                break;
            }
        }

        for message in &self.reply {
            transport.send(message.clone()).await?;
        }
        Ok(())
    }
}

/// Start the demo server on an ephemeral port.
pub async fn spawn_server(config: AppConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.wait();

    tokio::spawn(async move {
        let _ = HttpServer::new(config).run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}
