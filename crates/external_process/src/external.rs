use std::{process::ExitStatus, time::Duration};

use stream_gobbler::{Collected, OutputDrains};
use tokio::{
    io::AsyncWriteExt,
    process::{Child, ChildStdin},
};
use tracing::warn;

use crate::ProcessError;

/// A running process started by [`crate::ExternalProcessBuilder::start`].
///
/// Output is already being drained by background workers; this handle only manages stdin,
/// the exit status, and access to collected output.
#[derive(Debug)]
pub struct ExternalProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    drains: OutputDrains,
    collected: Option<Collected>,
    collect_timeout: Duration,
}

impl ExternalProcess {
    pub(crate) fn new(
        child: Child,
        stdin: Option<ChildStdin>,
        drains: OutputDrains,
        collected: Option<Collected>,
        collect_timeout: Duration,
    ) -> Self {
        Self {
            child,
            stdin,
            drains,
            collected,
            collect_timeout,
        }
    }

    /// OS process id, `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn stdin(&mut self) -> Option<&mut ChildStdin> {
        self.stdin.as_mut()
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    /// Writes `bytes` to stdin and closes it.
    pub async fn write_stdin(&mut self, bytes: &[u8]) -> Result<(), ProcessError> {
        let mut stdin = self.stdin.take().ok_or(ProcessError::StdinUnavailable)?;
        stdin
            .write_all(bytes)
            .await
            .map_err(ProcessError::StdinWrite)?;
        stdin.shutdown().await.map_err(ProcessError::StdinWrite)?;
        Ok(())
    }

    /// Waits for the process to exit.
    ///
    /// Stdin is closed first so a child reading it to end-of-file can finish. When stdout is
    /// being collected this also waits, up to the configured collect timeout, for the
    /// collection to complete.
    pub async fn wait(&mut self) -> Result<ExitStatus, ProcessError> {
        drop(self.stdin.take());
        let status = self.child.wait().await.map_err(ProcessError::Wait)?;

        if let Some(collected) = self.collected.as_ref() {
            if !collected
                .await_output_collection(self.collect_timeout)
                .await
            {
                warn!(
                    timeout = ?self.collect_timeout,
                    fault = ?self.drains.stdout().fault(),
                    "stdout collection did not complete after process exit"
                );
            }
        }
        Ok(status)
    }

    pub async fn kill(&mut self) -> Result<(), ProcessError> {
        self.child.kill().await.map_err(ProcessError::Kill)
    }

    pub fn drains(&self) -> &OutputDrains {
        &self.drains
    }

    pub fn collected(&self) -> Option<&Collected> {
        self.collected.as_ref()
    }

    /// Collected stdout lines; empty unless text collection was requested.
    pub fn text_output(&self) -> Vec<String> {
        match &self.collected {
            Some(Collected::Text(collector)) => collector.text_output(),
            _ => Vec::new(),
        }
    }

    /// Collected stdout bytes; empty unless binary collection was requested.
    pub fn binary_output(&self) -> Vec<u8> {
        match &self.collected {
            Some(Collected::Binary(collector)) => collector.binary_output(),
            _ => Vec::new(),
        }
    }
}
