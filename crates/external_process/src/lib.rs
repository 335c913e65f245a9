#![forbid(unsafe_code)]
//! Launch external processes and stream their output to listeners.
//!
//! Process spawning comes from `tokio::process`; draining stdout and stderr is delegated to
//! [`stream_gobbler`], which runs one worker per output channel from the moment the process
//! starts.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use external_process::{DrainStrategy, ExternalProcessBuilder, TextOutputCollector};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let errors = TextOutputCollector::new();
//! let mut process = ExternalProcessBuilder::parse("make -k all")?
//!     .process_stderr(DrainStrategy::text().listener(errors.clone()))
//!     .collect_stdout()
//!     .start()?;
//!
//! let status = process.wait().await?;
//! errors.await_output_collection(Duration::from_secs(1)).await;
//! println!("{status}: {} lines out, {} lines err", process.text_output().len(), errors.text_output().len());
//! # Ok(()) }
//! ```

mod builder;
mod command;
mod error;
mod external;
mod process;

pub use builder::{ExternalProcessBuilder, DEFAULT_COLLECT_TIMEOUT};
pub use command::parse_command_line;
pub use error::ProcessError;
pub use external::ExternalProcess;

pub use stream_gobbler::{
    byte_listener, char_listener, line_listener, BinaryOutputCollector, ByteListener, Channel,
    Collected, DrainSettings, DrainStrategy, DrainState, GobbleError, ListenerError,
    OutputDrains, TextEncoding, TextListener, TextOutputCollector,
};
