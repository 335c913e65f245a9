use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncRead, Empty},
    runtime::Handle,
    sync::watch,
    task, time,
};
use tracing::{debug, warn};

use crate::{gobble, Channel, DrainStrategy, DrainSummary, GobbleError};

/// Lifecycle of one channel worker.
#[derive(Debug, Clone)]
pub enum DrainState {
    Draining,
    /// End-of-stream was reached and dispatched to every listener.
    Completed(DrainSummary),
    /// The worker aborted; listeners never saw end-of-stream.
    Faulted(Arc<GobbleError>),
}

impl DrainState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DrainState::Draining)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, DrainState::Completed(_))
    }
}

/// Aggregate state of all workers started for one process.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DrainPhase {
    Draining,
    Drained,
}

/// Readable output channels of a started process.
///
/// `stderr` is `None` when the process was started with stderr merged into stdout.
pub struct OutputPipes<O, E> {
    pub stdout: O,
    pub stderr: Option<E>,
}

impl<O, E> OutputPipes<O, E> {
    pub fn separate(stdout: O, stderr: E) -> Self {
        Self {
            stdout,
            stderr: Some(stderr),
        }
    }

    pub fn is_merged(&self) -> bool {
        self.stderr.is_none()
    }
}

impl<O> OutputPipes<O, Empty> {
    pub fn merged(stdout: O) -> Self {
        Self {
            stdout,
            stderr: None,
        }
    }
}

/// Per-channel drain configuration, before any worker exists.
#[derive(Default)]
pub struct DrainPlan {
    stdout: DrainStrategy,
    stderr: DrainStrategy,
}

impl DrainPlan {
    /// Both channels default to discard-and-consume.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdout(mut self, strategy: impl Into<DrainStrategy>) -> Self {
        self.stdout = strategy.into();
        self
    }

    pub fn stderr(mut self, strategy: impl Into<DrainStrategy>) -> Self {
        self.stderr = strategy.into();
        self
    }

    /// Launches one independent worker per unmerged channel. Must be called from within a
    /// tokio runtime.
    ///
    /// Workers run on the runtime's blocking pool and drive their reads through the runtime
    /// handle, so listeners are called on the worker's own thread.
    pub fn start<O, E>(self, pipes: OutputPipes<O, E>) -> OutputDrains
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let stdout = spawn_worker(Channel::Stdout, pipes.stdout, self.stdout);
        let stderr = match pipes.stderr {
            Some(reader) => Some(spawn_worker(Channel::Stderr, reader, self.stderr)),
            None => {
                debug!(
                    ignored_mode = self.stderr.mode(),
                    "stderr is merged into stdout; no stderr worker started"
                );
                None
            }
        };
        OutputDrains { stdout, stderr }
    }
}

fn spawn_worker<R>(channel: Channel, reader: R, strategy: DrainStrategy) -> ChannelDrain
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (tx, rx) = watch::channel(DrainState::Draining);
    debug!(
        %channel,
        mode = strategy.mode(),
        buffer_size = strategy.buffer_size(),
        "starting drain worker"
    );

    // Listener callbacks are synchronous and may block. Each worker gets its own blocking-pool
    // thread so a stuck listener never holds a runtime thread, even on a current-thread runtime.
    let handle = Handle::current();
    let worker = task::spawn_blocking(move || handle.block_on(gobble(channel, reader, strategy)));
    tokio::spawn(async move {
        let state = match worker.await {
            Ok(Ok(summary)) => {
                debug!(
                    %channel,
                    bytes = summary.bytes,
                    chunks = summary.chunks,
                    lines = summary.lines,
                    "channel drained"
                );
                DrainState::Completed(summary)
            }
            Ok(Err(err)) => {
                warn!(%channel, error = %err, "channel drain aborted");
                DrainState::Faulted(Arc::new(err))
            }
            Err(join) => {
                let err = GobbleError::Worker {
                    channel,
                    message: join.to_string(),
                };
                warn!(%channel, error = %err, "channel drain worker failed");
                DrainState::Faulted(Arc::new(err))
            }
        };
        tx.send_replace(state);
    });

    ChannelDrain { channel, state: rx }
}

/// Observer for one running channel worker.
#[derive(Debug, Clone)]
pub struct ChannelDrain {
    channel: Channel,
    state: watch::Receiver<DrainState>,
}

impl ChannelDrain {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn state(&self) -> DrainState {
        self.state.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().is_terminal()
    }

    pub fn fault(&self) -> Option<Arc<GobbleError>> {
        match &*self.state.borrow() {
            DrainState::Faulted(err) => Some(Arc::clone(err)),
            _ => None,
        }
    }

    /// Waits up to `timeout` for the worker to finish. `None` means it is still draining.
    pub async fn wait(&self, timeout: Duration) -> Option<DrainState> {
        time::timeout(timeout, self.finished()).await.ok()
    }

    async fn finished(&self) -> DrainState {
        let mut rx = self.state.clone();
        // Bound to a local so the watch guard is released before `rx` goes out of scope.
        let outcome = match rx.wait_for(DrainState::is_terminal).await {
            Ok(state) => state.clone(),
            // The supervisor went away without publishing, e.g. on runtime shutdown.
            Err(_) => DrainState::Faulted(Arc::new(GobbleError::Worker {
                channel: self.channel,
                message: "drain supervisor stopped before reporting a result".to_string(),
            })),
        };
        outcome
    }
}

/// Workers started by [`DrainPlan::start`].
#[derive(Debug, Clone)]
pub struct OutputDrains {
    stdout: ChannelDrain,
    stderr: Option<ChannelDrain>,
}

impl OutputDrains {
    pub fn stdout(&self) -> &ChannelDrain {
        &self.stdout
    }

    /// `None` when stderr was merged into stdout.
    pub fn stderr(&self) -> Option<&ChannelDrain> {
        self.stderr.as_ref()
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelDrain> {
        match channel {
            Channel::Stdout => Some(&self.stdout),
            Channel::Stderr => self.stderr(),
        }
    }

    pub fn is_merged(&self) -> bool {
        self.stderr.is_none()
    }

    pub fn phase(&self) -> DrainPhase {
        if self.workers().all(ChannelDrain::is_finished) {
            DrainPhase::Drained
        } else {
            DrainPhase::Draining
        }
    }

    pub fn faults(&self) -> Vec<Arc<GobbleError>> {
        self.workers().filter_map(ChannelDrain::fault).collect()
    }

    /// Waits up to `timeout` for every worker to finish, completed or faulted.
    pub async fn wait_all(&self, timeout: Duration) -> bool {
        time::timeout(timeout, async {
            for worker in self.workers() {
                worker.finished().await;
            }
        })
        .await
        .is_ok()
    }

    fn workers(&self) -> impl Iterator<Item = &ChannelDrain> {
        std::iter::once(&self.stdout).chain(self.stderr.as_ref())
    }
}

/// Convenience for starting a plan on a merged stream.
pub fn start_merged<O>(plan: DrainPlan, stdout: O) -> OutputDrains
where
    O: AsyncRead + Unpin + Send + 'static,
{
    plan.start(OutputPipes::<O, Empty>::merged(stdout))
}
