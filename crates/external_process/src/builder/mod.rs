use std::{
    collections::BTreeMap,
    ffi::OsString,
    fmt,
    path::PathBuf,
    process::Stdio,
    time::Duration,
};

use stream_gobbler::{DrainPlan, DrainStrategy, OutputPipes};
use tokio::process::Command;
use tracing::debug;

use crate::{command::parse_command_line, process, ExternalProcess, ProcessError};

pub const DEFAULT_COLLECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configures and starts an external process whose output is drained concurrently.
///
/// Both output channels default to discard-and-consume, so a child that writes a lot never
/// blocks on a full pipe even when nobody listens.
pub struct ExternalProcessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    env_clear: bool,
    redirect_stderr: bool,
    pipe_stdin: bool,
    stdout: DrainStrategy,
    stderr: DrainStrategy,
    collect_stdout: bool,
    collect_timeout: Duration,
}

impl fmt::Debug for ExternalProcessBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalProcessBuilder")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("env_clear", &self.env_clear)
            .field("redirect_stderr", &self.redirect_stderr)
            .field("pipe_stdin", &self.pipe_stdin)
            .field("stdout", &self.stdout.mode())
            .field("stderr", &self.stderr.mode())
            .field("collect_stdout", &self.collect_stdout)
            .field("collect_timeout", &self.collect_timeout)
            .finish()
    }
}

impl ExternalProcessBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            env_clear: false,
            redirect_stderr: false,
            pipe_stdin: true,
            stdout: DrainStrategy::discard(),
            stderr: DrainStrategy::discard(),
            collect_stdout: false,
            collect_timeout: DEFAULT_COLLECT_TIMEOUT,
        }
    }

    /// Builds a process from a shell-style command line such as `grep -n 'a b' file.txt`.
    pub fn parse(command_line: &str) -> Result<Self, ProcessError> {
        let mut words = parse_command_line(command_line)?.into_iter();
        let program = words.next().ok_or(ProcessError::EmptyCommand)?;
        Ok(Self::new(program).args(words))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Sets or overrides one environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Starts from an empty environment instead of inheriting the parent's. Variables set
    /// with [`Self::env`] are still applied.
    pub fn clear_env(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Sends stderr into the stdout pipe. No stderr worker is started and any strategy given
    /// to [`Self::process_stderr`] is ignored.
    pub fn redirect_stderr(mut self) -> Self {
        self.redirect_stderr = true;
        self
    }

    /// Connects the child's stdin to `/dev/null` instead of a pipe.
    pub fn stdin_null(mut self) -> Self {
        self.pipe_stdin = false;
        self
    }

    pub fn process_stdout(mut self, strategy: impl Into<DrainStrategy>) -> Self {
        self.stdout = strategy.into();
        self
    }

    pub fn process_stderr(mut self, strategy: impl Into<DrainStrategy>) -> Self {
        self.stderr = strategy.into();
        self
    }

    /// Keeps all stdout output on the returned process: lines for a text (or discard)
    /// strategy, bytes for a binary one.
    pub fn collect_stdout(mut self) -> Self {
        self.collect_stdout = true;
        self
    }

    /// Upper bound [`ExternalProcess::wait`] spends waiting for collected stdout after exit.
    pub fn collect_timeout(mut self, timeout: Duration) -> Self {
        self.collect_timeout = timeout;
        self
    }

    /// Spawns the process and starts draining its output before returning.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<ExternalProcess, ProcessError> {
        let Self {
            program,
            args,
            working_dir,
            env,
            env_clear,
            redirect_stderr,
            pipe_stdin,
            stdout,
            stderr,
            collect_stdout,
            collect_timeout,
        } = self;

        let mut command = Command::new(&program);
        command.args(&args);
        if let Some(dir) = working_dir.as_ref() {
            command.current_dir(dir);
        }
        if env_clear {
            command.env_clear();
        }
        process::apply_env(&mut command, &env);
        command.stdin(if pipe_stdin {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let merged = if redirect_stderr {
            Some(process::merge_stderr_into_stdout(&mut command)?)
        } else {
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());
            None
        };

        let mut child = process::spawn_with_retry(&mut command, &program)?;
        // Release the parent's copies of the merged pipe's write end.
        drop(command);
        debug!(
            program = %program.display(),
            pid = ?child.id(),
            merged = redirect_stderr,
            "spawned external process"
        );

        let (stdout, collected) = if collect_stdout {
            let (strategy, collected) = stdout.with_collector();
            (strategy, Some(collected))
        } else {
            (stdout, None)
        };
        let plan = DrainPlan::new().stdout(stdout).stderr(stderr);

        let drains = match merged {
            Some(reader) => plan.start(OutputPipes::merged(reader)),
            None => {
                let out = child.stdout.take().ok_or(ProcessError::MissingStdout)?;
                let err = child.stderr.take().ok_or(ProcessError::MissingStderr)?;
                plan.start(OutputPipes::separate(out, err))
            }
        };

        let stdin = child.stdin.take();
        Ok(ExternalProcess::new(
            child,
            stdin,
            drains,
            collected,
            collect_timeout,
        ))
    }
}
