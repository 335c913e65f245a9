use std::error::Error as StdError;

use thiserror::Error;

use crate::{Channel, TextEncoding};

/// Strict decoding failures raised by [`crate::IncrementalDecoder`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DecodeError {
    #[error("malformed {encoding} input at byte offset {offset}")]
    Malformed { encoding: TextEncoding, offset: u64 },
    #[error("stream ended inside a {encoding} character ({pending} undecoded bytes)")]
    TruncatedSequence {
        encoding: TextEncoding,
        pending: usize,
    },
}

/// Error returned by a listener callback. Any listener error aborts the drain of its channel.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ListenerError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for ListenerError {
    fn from(source: std::io::Error) -> Self {
        Self::with_source("listener I/O failed", source)
    }
}

/// Reasons a channel worker stopped before reaching end-of-stream.
#[derive(Debug, Error)]
pub enum GobbleError {
    #[error("failed reading {channel}: {source}")]
    Read {
        channel: Channel,
        #[source]
        source: std::io::Error,
    },
    #[error("failed decoding {channel}: {source}")]
    Decode {
        channel: Channel,
        #[source]
        source: DecodeError,
    },
    #[error("{channel} listener failed: {source}")]
    Listener {
        channel: Channel,
        #[source]
        source: ListenerError,
    },
    #[error("{channel} drain worker stopped unexpectedly: {message}")]
    Worker { channel: Channel, message: String },
}

impl GobbleError {
    pub fn channel(&self) -> Channel {
        match self {
            GobbleError::Read { channel, .. }
            | GobbleError::Decode { channel, .. }
            | GobbleError::Listener { channel, .. }
            | GobbleError::Worker { channel, .. } => *channel,
        }
    }
}
