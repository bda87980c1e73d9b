//! Header helpers.
//!
//! Header sets are never edited in place while an exchange is running;
//! a rewrite produces a fresh map from the old one plus overrides.

use axum::http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use super::format::JSON_CONTENT_TYPE;

/// Copy `headers`, replacing every value of each overridden name.
pub fn with_overrides<I>(headers: &HeaderMap, overrides: I) -> HeaderMap
where
    I: IntoIterator<Item = (HeaderName, HeaderValue)>,
{
    let mut out = headers.clone();
    for (name, value) in overrides {
        out.insert(name, value);
    }
    out
}

/// The first value of `name`, if present and visible ASCII.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Whether the declared content type is exactly the JSON type.
pub fn is_json(headers: &HeaderMap) -> bool {
    header_str(headers, &CONTENT_TYPE) == Some(JSON_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{ACCEPT, CONTENT_LENGTH};

    #[test]
    fn test_overrides_leave_original_untouched() {
        let mut original = HeaderMap::new();
        original.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        original.append(ACCEPT, HeaderValue::from_static("a/b"));
        original.append(ACCEPT, HeaderValue::from_static("c/d"));

        let rewritten = with_overrides(
            &original,
            [
                (CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE)),
                (CONTENT_LENGTH, HeaderValue::from(12usize)),
            ],
        );

        assert_eq!(header_str(&original, &CONTENT_TYPE), Some("text/plain"));
        assert!(original.get(CONTENT_LENGTH).is_none());
        assert!(is_json(&rewritten));
        assert_eq!(header_str(&rewritten, &CONTENT_LENGTH), Some("12"));
        assert_eq!(rewritten.get_all(ACCEPT).iter().count(), 2);
    }

    #[test]
    fn test_is_json_is_exact() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(!is_json(&headers));
    }
}
