//! Offline conversion between LLSD encodings and JSON.
//!
//! Backs the `llsd-convert` binary. JSON output is pretty-printed; LLSD
//! output uses the canonical form of each encoding.

use std::fmt;

use crate::llsd::{self, Value};
use crate::transcode::{json, Format, TranscodeError};

/// Anything `llsd-convert` can read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Encoding {
    Xml,
    Binary,
    Notation,
    Json,
}

impl Encoding {
    fn llsd(self) -> Option<Format> {
        match self {
            Encoding::Xml => Some(Format::Xml),
            Encoding::Binary => Some(Format::Binary),
            Encoding::Notation => Some(Format::Notation),
            Encoding::Json => None,
        }
    }

    /// Guess from a file extension (`.xml`, `.llsd`, `.bin`, `.notation`, `.json`).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xml" | "llsd" => Some(Encoding::Xml),
            "bin" | "binary" => Some(Encoding::Binary),
            "notation" | "txt" => Some(Encoding::Notation),
            "json" => Some(Encoding::Json),
            _ => None,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.llsd() {
            Some(format) => write!(f, "{format}"),
            None => f.write_str("json"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot parse {encoding} input: {source}")]
    Llsd {
        encoding: Encoding,
        #[source]
        source: llsd::Error,
    },

    #[error(transparent)]
    Json(#[from] TranscodeError),

    #[error("cannot render JSON: {0}")]
    Render(#[from] serde_json::Error),
}

pub fn decode(input: &[u8], from: Encoding) -> Result<Value, ConvertError> {
    match from.llsd() {
        Some(format) => format.decode(input).map_err(|source| ConvertError::Llsd {
            encoding: from,
            source,
        }),
        None => Ok(json::decode(input)?),
    }
}

pub fn encode(value: &Value, to: Encoding) -> Result<Vec<u8>, ConvertError> {
    match to.llsd() {
        Some(format) => Ok(format.encode(value)),
        None => {
            let mut out = serde_json::to_vec_pretty(&json::to_json(value)?)?;
            out.push(b'\n');
            Ok(out)
        }
    }
}

pub fn convert(input: &[u8], from: Encoding, to: Encoding) -> Result<Vec<u8>, ConvertError> {
    encode(&decode(input, from)?, to)
}
