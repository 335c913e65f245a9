use std::{collections::BTreeMap, path::Path, time::Duration};

use tokio::process::{Child, Command};

use crate::ProcessError;

#[cfg(unix)]
pub(crate) type MergedReader = tokio::net::unix::pipe::Receiver;

#[cfg(not(unix))]
pub(crate) type MergedReader = tokio::io::Empty;

pub(crate) fn spawn_with_retry(command: &mut Command, program: &Path) -> Result<Child, ProcessError> {
    let mut backoff = Duration::from_millis(2);
    for attempt in 0..5 {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                // ETXTBSY: the executable was written moments ago and is still open for writing.
                let is_busy = matches!(source.kind(), std::io::ErrorKind::ExecutableFileBusy)
                    || source.raw_os_error() == Some(26);
                if is_busy && attempt < 4 {
                    std::thread::sleep(backoff);
                    backoff = std::cmp::min(backoff * 2, Duration::from_millis(50));
                    continue;
                }
                return Err(ProcessError::Spawn {
                    program: program.to_path_buf(),
                    source,
                });
            }
        }
    }

    unreachable!("spawn_with_retry should return before exhausting retries")
}

pub(crate) fn apply_env(command: &mut Command, env: &BTreeMap<String, String>) {
    for (k, v) in env {
        command.env(k, v);
    }
}

/// Points both stdout and stderr of `command` at one OS pipe and returns its read end.
///
/// The command keeps copies of the write end until it is dropped; the reader only sees
/// end-of-stream once the command and the child have both released them.
#[cfg(unix)]
pub(crate) fn merge_stderr_into_stdout(command: &mut Command) -> Result<MergedReader, ProcessError> {
    use std::os::fd::OwnedFd;

    let (reader, writer) = std::io::pipe().map_err(ProcessError::MergeStderr)?;
    let stderr_writer = writer.try_clone().map_err(ProcessError::MergeStderr)?;
    command.stdout(writer);
    command.stderr(stderr_writer);
    tokio::net::unix::pipe::Receiver::from_owned_fd(OwnedFd::from(reader))
        .map_err(ProcessError::MergeStderr)
}

#[cfg(not(unix))]
pub(crate) fn merge_stderr_into_stdout(
    _command: &mut Command,
) -> Result<MergedReader, ProcessError> {
    Err(ProcessError::MergeStderr(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "stderr redirection is only supported on unix",
    )))
}
