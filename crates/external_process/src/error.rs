use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("command line is empty")]
    EmptyCommand,
    #[error("failed to parse command line `{command}`: {source}")]
    Parse {
        command: String,
        #[source]
        source: shell_words::ParseError,
    },
    #[error("failed to spawn process (program={program:?}): {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to redirect stderr into stdout: {0}")]
    MergeStderr(#[source] io::Error),
    #[error("internal error: missing stdout pipe")]
    MissingStdout,
    #[error("internal error: missing stderr pipe")]
    MissingStderr,
    #[error("stdin is not available (already taken or not piped)")]
    StdinUnavailable,
    #[error("failed writing stdin: {0}")]
    StdinWrite(#[source] io::Error),
    #[error("failed waiting for process: {0}")]
    Wait(#[source] io::Error),
    #[error("failed to kill process: {0}")]
    Kill(#[source] io::Error),
}
