//! The closed table of LLSD wire formats.

use std::fmt;
use std::str::FromStr;

use crate::llsd::{self, Value};

/// Canonical content type of the internal representation.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// One of the three LLSD encodings, each tied to its MIME type and codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Xml,
    Binary,
    Notation,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Xml, Format::Binary, Format::Notation];

    /// MIME type used on the wire.
    pub const fn mime(self) -> &'static str {
        match self {
            Format::Xml => "application/llsd+xml",
            Format::Binary => "application/llsd+binary",
            Format::Notation => "application/llsd+notation",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Binary => "binary",
            Format::Notation => "notation",
        }
    }

    /// Exact, case-sensitive lookup. Anything else means "not LLSD".
    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.mime() == mime)
    }

    pub fn encode(self, value: &Value) -> Vec<u8> {
        match self {
            Format::Xml => llsd::xml::to_vec(value),
            Format::Binary => llsd::binary::to_vec(value),
            Format::Notation => llsd::notation::to_vec(value),
        }
    }

    pub fn decode(self, bytes: &[u8]) -> Result<Value, llsd::Error> {
        match self {
            Format::Xml => llsd::xml::from_slice(bytes),
            Format::Binary => llsd::binary::from_slice(bytes),
            Format::Notation => llsd::notation::from_slice(bytes),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown LLSD format '{s}'"))
    }
}
