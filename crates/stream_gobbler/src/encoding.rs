use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// Text encodings understood by the incremental decoder.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Ascii,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("unsupported text encoding `{0}`")]
pub struct UnknownEncoding(pub String);

impl TextEncoding {
    /// Canonical label, as used by `Display`.
    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16Le => "UTF-16LE",
            TextEncoding::Utf16Be => "UTF-16BE",
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Ascii => "US-ASCII",
        }
    }

    /// Longest byte sequence that encodes a single character.
    pub fn max_char_width(&self) -> usize {
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf16Le | TextEncoding::Utf16Be => 4,
            TextEncoding::Latin1 | TextEncoding::Ascii => 1,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = UnknownEncoding;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "utf-16le" | "utf16le" => Ok(TextEncoding::Utf16Le),
            "utf-16be" | "utf16be" => Ok(TextEncoding::Utf16Be),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(TextEncoding::Latin1),
            "us-ascii" | "ascii" => Ok(TextEncoding::Ascii),
            _ => Err(UnknownEncoding(raw.to_string())),
        }
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = UnknownEncoding;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}
