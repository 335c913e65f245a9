#![forbid(unsafe_code)]
//! Stream-gobbling engine for child process output.
//!
//! Each output channel of a process is drained by its own worker so the child never blocks on
//! a full pipe. A worker reads fixed-size chunks and either forwards them untouched to
//! [`ByteListener`]s or decodes them incrementally and splits the text into character and line
//! events for [`TextListener`]s. [`TextOutputCollector`] and [`BinaryOutputCollector`] keep the
//! output around and signal when the channel has been fully collected.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use stream_gobbler::{DrainPlan, DrainStrategy, OutputPipes, TextOutputCollector};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let lines = TextOutputCollector::new();
//! let drains = DrainPlan::new()
//!     .stdout(DrainStrategy::text().listener(lines.clone()))
//!     .start(OutputPipes::separate(&b"hello\nworld\n"[..], tokio::io::empty()));
//!
//! assert!(lines.await_output_collection(Duration::from_secs(1)).await);
//! assert_eq!(lines.text_output(), vec!["hello", "world"]);
//! assert!(drains.wait_all(Duration::from_secs(1)).await);
//! # }
//! ```

mod channel;
mod collect;
mod config;
mod decoder;
mod drain;
mod encoding;
mod error;
mod gobble;
mod listener;
mod reader;
mod tokenizer;

pub use channel::Channel;
pub use collect::{BinaryOutputCollector, CompletionSignal, TextOutputCollector};
pub use config::{
    BinaryDrain, Collected, DrainSettings, DrainStrategy, ResiduePolicy, TextDrain,
    DEFAULT_BUFFER_SIZE,
};
pub use decoder::IncrementalDecoder;
pub use drain::{
    start_merged, ChannelDrain, DrainPhase, DrainPlan, DrainState, OutputDrains, OutputPipes,
};
pub use encoding::{TextEncoding, UnknownEncoding};
pub use error::{DecodeError, GobbleError, ListenerError};
pub use gobble::{discard, gobble, gobble_text, pump_bytes, DrainSummary};
pub use listener::{
    byte_listener, char_listener, line_listener, ByteListener, ByteListeners, BytesFn, CharFn,
    LineFn, TextListener, TextListeners,
};
pub use reader::ChunkReader;
pub use tokenizer::LineTokenizer;
