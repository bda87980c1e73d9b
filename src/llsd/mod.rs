//! LLSD value model and wire codecs.
//!
//! # Data Flow
//! ```text
//! wire bytes
//!     → xml.rs / binary.rs / notation.rs (parse)
//!     → Value (format-independent tree)
//!     → xml.rs / binary.rs / notation.rs (format)
//!     → wire bytes
//! ```
//!
//! # Design Decisions
//! - One value model shared by all three encodings
//! - Encoders are infallible; every `Value` has a representation in each format
//! - Decoders report the byte offset of the first problem they hit
//! - Decoders refuse containers nested deeper than [`MAX_DEPTH`]

pub mod binary;
pub mod notation;
pub mod xml;

mod date;
mod value;

pub use date::Date;
pub use value::Value;

/// Errors produced while parsing LLSD.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unexpected end of input at offset {0}")]
    Eof(usize),

    #[error("syntax error at offset {offset}: {reason}")]
    Syntax { offset: usize, reason: String },

    #[error("invalid {kind} literal {text:?}")]
    Literal { kind: &'static str, text: String },

    #[error("unknown element <{0}>")]
    UnknownElement(String),

    #[error("invalid UTF-8 at offset {0}")]
    Utf8(usize),

    #[error("trailing data at offset {0}")]
    TrailingData(usize),
}

impl Error {
    pub(crate) fn syntax(offset: usize, reason: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn literal(kind: &'static str, text: impl Into<String>) -> Self {
        Self::Literal {
            kind,
            text: text.into(),
        }
    }
}

pub type Res<T> = Result<T, Error>;

/// Deepest nesting of arrays and maps the decoders accept.
pub const MAX_DEPTH: usize = 128;

/// Step one container deeper, failing once `MAX_DEPTH` is exceeded.
pub(crate) fn descend(depth: &mut usize, offset: usize) -> Res<()> {
    *depth += 1;
    if *depth > MAX_DEPTH {
        return Err(Error::syntax(offset, "nesting too deep"));
    }
    Ok(())
}

/// Decode standard base64, ignoring embedded whitespace.
pub(crate) fn decode_base64(text: &str) -> Res<Vec<u8>> {
    use base64::Engine as _;

    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| Error::literal("base64", text))
}

pub(crate) fn encode_base64(bytes: &[u8]) -> String {
    use base64::Engine as _;

    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Real numbers are written so that they parse back to the same `f64`.
pub(crate) fn format_real(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{v:?}")
    }
}

pub(crate) fn parse_real(text: &str) -> Res<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| Error::literal("real", text))
}
