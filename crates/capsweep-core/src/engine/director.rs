use crate::core::identity::RunIdentity;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::{debug, info};

/// File inside a run's output directory that receives captured engine output.
pub const ENGINE_LOG_FILE: &str = "engine.log";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to start engine '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to open engine log '{path}': {source}", path = path.display())]
    Log {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed while waiting for engine '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// Where the engine's stdout and stderr go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineOutput {
    #[default]
    Inherit,
    Discard,
    /// Written to [`ENGINE_LOG_FILE`] in the run's output directory, and archived with it.
    Capture,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// `code` is `None` when the process was terminated by a signal.
    Failed { code: Option<i32> },
}

impl RunStatus {
    pub fn success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            RunStatus::Success
        } else {
            RunStatus::Failed {
                code: status.code(),
            }
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("exited successfully"),
            RunStatus::Failed { code: Some(code) } => write!(f, "exited with status {}", code),
            RunStatus::Failed { code: None } => f.write_str("terminated by signal"),
        }
    }
}

/// What the engine is told about the run it is executing. None of it reaches the
/// command line; the engine discovers its parameters from the active run configuration.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub identity: &'a RunIdentity,
    pub output_dir: &'a Path,
}

/// Runs the external simulator for one sweep point, blocking until it exits.
pub trait Engine {
    fn invoke(&self, run: &RunContext<'_>) -> Result<RunStatus, EngineError>;
}

/// The external simulator entry point: a fixed program with fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub output: EngineOutput,
}

impl EngineCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: PathBuf::from("."),
            output: EngineOutput::default(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn output(mut self, output: EngineOutput) -> Self {
        self.output = output;
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// [`Engine`] backed by a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: EngineCommand,
}

impl ProcessEngine {
    pub fn new(command: EngineCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    fn configure_output(&self, cmd: &mut Command, output_dir: &Path) -> Result<(), EngineError> {
        match self.command.output {
            EngineOutput::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            EngineOutput::Discard => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
            EngineOutput::Capture => {
                let path = output_dir.join(ENGINE_LOG_FILE);
                let log_err = |source| EngineError::Log {
                    path: path.clone(),
                    source,
                };
                let stdout = File::create(&path).map_err(log_err)?;
                let stderr = stdout.try_clone().map_err(log_err)?;
                cmd.stdout(stdout).stderr(stderr);
            }
        }
        Ok(())
    }
}

impl Engine for ProcessEngine {
    fn invoke(&self, run: &RunContext<'_>) -> Result<RunStatus, EngineError> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null());
        self.configure_output(&mut cmd, run.output_dir)?;

        info!(
            "Invoking engine `{}` for {}.",
            self.command.command_line(),
            run.identity
        );
        let mut child = cmd.spawn().map_err(|e| EngineError::Spawn {
            program: self.command.program.clone(),
            source: e,
        })?;
        let status = child.wait().map_err(|e| EngineError::Wait {
            program: self.command.program.clone(),
            source: e,
        })?;

        let status = RunStatus::from(status);
        debug!("Engine for {} {}.", run.identity, status);
        Ok(status)
    }
}
