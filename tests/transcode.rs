//! Message-level behaviour of the LLSD middleware.

use axum::body::Bytes;
use axum::http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};

use llsd_transcoder::transcode::{
    App, Buffered, Direction, Format, LlsdMiddleware, Message, Scope, TranscodeError,
};

mod common;
use common::{hello, json_headers, parts, ScriptedApp, HELLO_JSON};

async fn run(
    middleware: &LlsdMiddleware<ScriptedApp>,
    headers: &[(&'static str, &'static str)],
    inbound: Vec<Message>,
) -> (Result<(), TranscodeError>, Vec<Message>) {
    let mut transport = Buffered::new(inbound);
    let result = middleware
        .call(Scope::Http(parts(headers)), &mut transport)
        .await;
    (result, transport.into_sent())
}

fn split_response(sent: &[Message]) -> (StatusCode, &HeaderMap, &Bytes) {
    match sent {
        [Message::ResponseStart { status, headers }, Message::ResponseBody { body, more_body: false }] => {
            (*status, headers, body)
        }
        other => panic!("unexpected response messages: {other:?}"),
    }
}

#[tokio::test]
async fn test_llsd_xml_request_reaches_app_as_json() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), false);
    let body = Format::Xml.encode(&hello());

    let (result, sent) = run(
        &middleware,
        &[("content-type", "application/llsd+xml")],
        vec![Message::request_body(body)],
    )
    .await;
    result.unwrap();

    let observed = middleware.inner().observed().await;
    let headers = observed.headers.unwrap();
    assert_eq!(headers[CONTENT_TYPE], "application/json");
    assert_eq!(observed.body, vec![Message::request_body(HELLO_JSON)]);
    let json: serde_json::Value = match &observed.body[0] {
        Message::RequestBody { body, .. } => serde_json::from_slice(body).unwrap(),
        other => panic!("{other:?}"),
    };
    assert_eq!(json, serde_json::json!({ "message": "Hello, world!" }));

    // Nobody asked for LLSD back.
    assert_eq!(sent, middleware.inner().reply);
}

#[tokio::test]
async fn test_binary_accept_encodes_response() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), false);

    let (result, sent) = run(
        &middleware,
        &[("content-type", "application/json"), ("accept", "application/llsd+binary")],
        vec![Message::request_body(HELLO_JSON)],
    )
    .await;
    result.unwrap();

    // Inbound was JSON already; the app sees it untouched.
    let observed = middleware.inner().observed().await;
    assert_eq!(observed.body, vec![Message::request_body(HELLO_JSON)]);

    let (status, headers, body) = split_response(&sent);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "application/llsd+binary");
    assert_eq!(headers[CONTENT_LENGTH], body.len().to_string().as_str());
    assert_eq!(Format::Binary.decode(body).unwrap(), hello());
}

#[tokio::test]
async fn test_notation_accept_keeps_status_and_other_headers() {
    let mut headers = json_headers(HELLO_JSON.len());
    headers.insert("x-request-id", HeaderValue::from_static("abc"));
    let app = ScriptedApp::new(vec![
        Message::ResponseStart {
            status: StatusCode::CREATED,
            headers,
        },
        Message::response_body(HELLO_JSON),
    ]);
    let middleware = LlsdMiddleware::new(app, false);

    let (result, sent) = run(
        &middleware,
        &[("accept", "application/llsd+notation")],
        vec![Message::request_body("")],
    )
    .await;
    result.unwrap();

    let (status, headers, body) = split_response(&sent);
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers["x-request-id"], "abc");
    assert_eq!(headers[CONTENT_TYPE], "application/llsd+notation");
    assert_eq!(body.as_ref(), b"{'message':'Hello, world!'}");
}

#[tokio::test]
async fn test_non_json_response_passes_through() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    let reply = vec![
        Message::ResponseStart {
            status: StatusCode::OK,
            headers,
        },
        Message::response_body("just text"),
    ];
    let middleware = LlsdMiddleware::new(ScriptedApp::new(reply.clone()), false);

    let (result, sent) = run(
        &middleware,
        &[("accept", "application/llsd+xml")],
        vec![Message::request_body("")],
    )
    .await;
    result.unwrap();
    assert_eq!(sent, reply);
}

#[tokio::test]
async fn test_llsd_response_passes_through() {
    let body = Format::Xml.encode(&hello());
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/llsd+xml"));
    let reply = vec![
        Message::ResponseStart {
            status: StatusCode::OK,
            headers,
        },
        Message::response_body(body),
    ];
    let middleware = LlsdMiddleware::new(ScriptedApp::new(reply.clone()), false);

    let (result, sent) = run(
        &middleware,
        &[("accept", "application/llsd+xml")],
        vec![Message::request_body("")],
    )
    .await;
    result.unwrap();
    assert_eq!(sent, reply);
}

#[tokio::test]
async fn test_no_accept_means_json() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), false);
    let (result, sent) = run(&middleware, &[], vec![Message::request_body("")]).await;
    result.unwrap();
    assert_eq!(sent, middleware.inner().reply);
}

#[tokio::test]
async fn test_lifespan_passes_through() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), true);
    let mut transport = Buffered::default();
    middleware.call(Scope::Lifespan, &mut transport).await.unwrap();

    assert!(middleware.inner().observed().await.lifespan);
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_streamed_request_is_rejected() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), false);
    let (result, sent) = run(
        &middleware,
        &[("content-type", "application/llsd+xml")],
        vec![
            Message::RequestBody {
                body: Bytes::from_static(b"<llsd><map>"),
                more_body: true,
            },
            Message::RequestBody {
                body: Bytes::from_static(b"</map></llsd>"),
                more_body: false,
            },
        ],
    )
    .await;

    assert!(matches!(
        result,
        Err(TranscodeError::UnsupportedStreaming(Direction::Request))
    ));
    assert!(middleware.inner().observed().await.body.is_empty());
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_empty_terminal_request_chunk_is_tolerated() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), false);
    let (result, _) = run(
        &middleware,
        &[("content-type", "application/llsd+binary")],
        vec![
            Message::RequestBody {
                body: Format::Binary.encode(&hello()).into(),
                more_body: true,
            },
            Message::RequestBody {
                body: Bytes::new(),
                more_body: false,
            },
        ],
    )
    .await;
    result.unwrap();
    assert_eq!(
        middleware.inner().observed().await.body,
        vec![Message::request_body(HELLO_JSON)]
    );
}

#[tokio::test]
async fn test_streamed_response_is_rejected() {
    let app = ScriptedApp::new(vec![
        Message::ResponseStart {
            status: StatusCode::OK,
            headers: json_headers(2),
        },
        Message::ResponseBody {
            body: Bytes::from_static(b"{"),
            more_body: true,
        },
        Message::ResponseBody {
            body: Bytes::from_static(b"}"),
            more_body: false,
        },
    ]);
    let middleware = LlsdMiddleware::new(app, false);

    let (result, sent) = run(
        &middleware,
        &[("accept", "application/llsd+xml")],
        vec![Message::request_body("")],
    )
    .await;

    assert!(matches!(
        result,
        Err(TranscodeError::UnsupportedStreaming(Direction::Response))
    ));
    assert!(sent.is_empty(), "nothing may reach the client: {sent:?}");
}

#[tokio::test]
async fn test_malformed_llsd_request() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), false);
    let (result, sent) = run(
        &middleware,
        &[("content-type", "application/llsd+notation")],
        vec![Message::request_body("{'message':")],
    )
    .await;

    assert!(matches!(
        result,
        Err(TranscodeError::Decode {
            format: Format::Notation,
            ..
        })
    ));
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_invalid_json_from_app() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(b"{not json"), false);
    let (result, sent) = run(
        &middleware,
        &[("accept", "application/llsd+xml")],
        vec![Message::request_body("")],
    )
    .await;
    assert!(matches!(result, Err(TranscodeError::InvalidJson(_))));
    assert!(sent.is_empty());
}

#[tokio::test]
async fn test_quirks_without_accept_answers_xml() {
    let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), true);
    let (result, sent) = run(&middleware, &[], vec![Message::request_body("")]).await;
    result.unwrap();

    let (_, headers, body) = split_response(&sent);
    assert!(headers.get(CONTENT_TYPE).is_none());
    assert_eq!(headers[CONTENT_LENGTH], body.len().to_string());
    assert_eq!(Format::Xml.decode(body).unwrap(), hello());
}

#[tokio::test]
async fn test_quirks_precedence() {
    let browser = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
    for (accept, expected) in [
        ("application/json, */*", None),
        ("*/*", Some(Format::Xml)),
        (browser, Some(Format::Xml)),
        ("image/png", None),
        ("application/llsd+binary", Some(Format::Binary)),
    ] {
        let middleware = LlsdMiddleware::new(ScriptedApp::json(HELLO_JSON), true);
        let headers = [("accept", accept)];
        let (result, sent) = run(&middleware, &headers, vec![Message::request_body("")]).await;
        result.unwrap();

        let (_, response_headers, body) = split_response(&sent);
        match expected {
            Some(format) => {
                // The accept value is echoed back verbatim.
                assert_eq!(response_headers[CONTENT_TYPE], accept, "{accept}");
                assert_eq!(format.decode(body).unwrap(), hello(), "{accept}");
            }
            None => {
                assert_eq!(response_headers[CONTENT_TYPE], "application/json", "{accept}");
                assert_eq!(&body[..], HELLO_JSON, "{accept}");
            }
        }
    }
}
