//! Header negotiation.
//!
//! # Responsibilities
//! - Pick the inbound format from the request `content-type`
//! - Pick the outbound format from the request `accept`
//! - Present `content-type: application/json` to the application when the
//!   inbound body is going to be decoded
//!
//! # Design Decisions
//! - Lookups are exact and case-sensitive; there is no MIME parameter parsing
//!   and no q-value ranking
//! - An unknown type is never an error, it just means "leave this direction alone"
//! - Quirks mode only widens the outbound side

use axum::http::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use super::format::{Format, JSON_CONTENT_TYPE};
use super::headers::{header_str, with_overrides};

/// What to do with the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboundMode {
    #[default]
    Inactive,
    Decode(Format),
}

/// What to do with the response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutboundMode {
    #[default]
    Inactive,
    Encode {
        format: Format,
        /// The request's `accept` value, written verbatim into the response
        /// `Content-Type`. `None` when quirks mode chose XML for a request
        /// without one; the response then goes out without a `Content-Type`.
        content_type: Option<HeaderValue>,
    },
}

impl OutboundMode {
    pub fn is_active(&self) -> bool {
        matches!(self, OutboundMode::Encode { .. })
    }

    pub fn format(&self) -> Option<Format> {
        match self {
            OutboundMode::Encode { format, .. } => Some(*format),
            OutboundMode::Inactive => None,
        }
    }
}

/// Decisions taken once, at the start of an exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Negotiation {
    pub inbound: InboundMode,
    pub outbound: OutboundMode,
}

impl Negotiation {
    /// The request headers the wrapped application should see.
    pub fn request_headers(&self, headers: &HeaderMap) -> HeaderMap {
        match self.inbound {
            InboundMode::Decode(_) => with_overrides(
                headers,
                [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            ),
            InboundMode::Inactive => headers.clone(),
        }
    }
}

/// Media ranges browsers send by default when nobody asked them to.
const BROWSER_DEFAULTS: [&str; 4] = [
    "text/html",
    "application/xhtml+xml",
    "application/xml",
    "text/xml",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Negotiator {
    quirks: bool,
}

impl Negotiator {
    pub fn new(quirks: bool) -> Self {
        Self { quirks }
    }

    pub fn negotiate(&self, headers: &HeaderMap) -> Negotiation {
        let inbound = match header_str(headers, &CONTENT_TYPE).and_then(Format::from_mime) {
            Some(format) => InboundMode::Decode(format),
            None => InboundMode::Inactive,
        };

        let accept = headers.get(ACCEPT);
        let exact = accept
            .and_then(|v| v.to_str().ok())
            .and_then(Format::from_mime);
        let outbound = match (exact, accept) {
            (Some(format), Some(value)) => OutboundMode::Encode {
                format,
                content_type: Some(value.clone()),
            },
            _ if self.quirks && prefers_llsd(accept) => OutboundMode::Encode {
                format: Format::Xml,
                content_type: accept.cloned(),
            },
            _ => OutboundMode::Inactive,
        };

        tracing::debug!(
            inbound = ?inbound,
            outbound = ?outbound.format(),
            quirks = self.quirks,
            "Negotiated LLSD transcoding"
        );

        Negotiation { inbound, outbound }
    }
}

/// Quirks fallback: does this accept header look like "whatever the server
/// prefers", as opposed to an explicit request for JSON?
///
/// Media ranges are scanned left to right. `application/json` wins if it
/// shows up before a wildcard or a browser default; ranges that are
/// neither are skipped.
fn prefers_llsd(accept: Option<&HeaderValue>) -> bool {
    let Some(accept) = accept.and_then(|v| v.to_str().ok()) else {
        return true;
    };
    if accept.trim().is_empty() {
        return true;
    }
    for range in accept.split(',') {
        let media = range.split(';').next().unwrap_or_default().trim();
        if media == JSON_CONTENT_TYPE {
            return false;
        }
        if media == "*/*" || BROWSER_DEFAULTS.contains(&media) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(*value));
        }
        map
    }

    fn outbound(quirks: bool, accept: Option<&'static str>) -> OutboundMode {
        let map = match accept {
            Some(value) => headers(&[("accept", value)]),
            None => HeaderMap::new(),
        };
        Negotiator::new(quirks).negotiate(&map).outbound
    }

    #[test]
    fn test_inbound_formats() {
        for format in Format::ALL {
            let n = Negotiator::default().negotiate(&headers(&[("content-type", format.mime())]));
            assert_eq!(n.inbound, InboundMode::Decode(format));
        }
        for other in ["text/plain", "application/json", "application/llsd+xml; charset=utf-8"] {
            let n = Negotiator::default().negotiate(&headers(&[("content-type", other)]));
            assert_eq!(n.inbound, InboundMode::Inactive, "{other}");
        }
        assert_eq!(
            Negotiator::default().negotiate(&HeaderMap::new()).inbound,
            InboundMode::Inactive
        );
    }

    #[test]
    fn test_request_headers_rewritten_only_when_decoding() {
        let original = headers(&[("content-type", "application/llsd+notation"), ("x-trace", "1")]);
        let n = Negotiator::default().negotiate(&original);
        let seen = n.request_headers(&original);
        assert_eq!(seen.get("content-type").unwrap(), "application/json");
        assert_eq!(seen.get("x-trace").unwrap(), "1");
        assert_eq!(original.get("content-type").unwrap(), "application/llsd+notation");

        let plain = headers(&[("content-type", "text/plain")]);
        let n = Negotiator::default().negotiate(&plain);
        assert_eq!(n.request_headers(&plain), plain);
    }

    #[test]
    fn test_outbound_exact_match() {
        for format in Format::ALL {
            assert_eq!(
                outbound(false, Some(format.mime())),
                OutboundMode::Encode {
                    format,
                    content_type: Some(HeaderValue::from_static(format.mime())),
                }
            );
        }
        assert_eq!(outbound(false, None), OutboundMode::Inactive);
        assert_eq!(outbound(false, Some("*/*")), OutboundMode::Inactive);
        assert_eq!(outbound(false, Some("application/json")), OutboundMode::Inactive);
    }

    #[test]
    fn test_quirks_fallback_to_xml() {
        let browser = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
        for accept in [None, Some(""), Some("*/*"), Some(browser), Some("image/png, */*")] {
            assert_eq!(
                outbound(true, accept).format(),
                Some(Format::Xml),
                "{accept:?}"
            );
        }
        assert_eq!(
            outbound(true, None),
            OutboundMode::Encode {
                format: Format::Xml,
                content_type: None,
            }
        );
        assert_eq!(
            outbound(true, Some(browser)),
            OutboundMode::Encode {
                format: Format::Xml,
                content_type: Some(HeaderValue::from_static(browser)),
            }
        );
    }

    #[test]
    fn test_quirks_honors_explicit_json() {
        for accept in [
            "application/json",
            "application/json, */*",
            "application/json;q=0.9, text/html",
            "image/png, application/json, */*",
        ] {
            assert_eq!(outbound(true, Some(accept)), OutboundMode::Inactive, "{accept}");
        }
        // A wildcard listed first is not an explicit preference.
        assert_eq!(outbound(true, Some("*/*, application/json")).format(), Some(Format::Xml));
        // Nothing recognisable: leave the response alone.
        assert_eq!(outbound(true, Some("image/png")), OutboundMode::Inactive);
    }

    #[test]
    fn test_quirks_keeps_exact_matches() {
        assert_eq!(
            outbound(true, Some("application/llsd+binary")).format(),
            Some(Format::Binary)
        );
    }
}
