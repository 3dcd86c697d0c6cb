//! Process invocation boundary.
//!
//! An [`Invoker`] runs one command to completion and reports what happened.
//! It knows nothing about resources or success policies; the lifecycle
//! controller talks to it through the trait so tests can swap in a fake that
//! never spawns processes.
//!
//! - [`shell`] holds [`ShellInvoker`], the production implementation built on
//!   `tokio::process::Command`.

pub mod shell;

use crate::config::schema::{default_interpreter, InvocationSettings};
use crate::error::InvocationError;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use shell::ShellInvoker;

/// Everything needed to run a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Script text, passed as one argument after the interpreter argv.
    pub command: String,
    pub interpreter: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Run `command` with the platform default interpreter, inherited
    /// environment and no timeout.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            interpreter: default_interpreter(),
            working_dir: None,
            environment: HashMap::new(),
            timeout: None,
        }
    }

    /// Build an invocation from per-resource settings, falling back to the
    /// given interpreter and timeout where the resource sets none.
    pub fn from_settings(
        command: impl Into<String>,
        settings: &InvocationSettings,
        interpreter: &[String],
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            command: command.into(),
            interpreter: settings
                .interpreter
                .clone()
                .unwrap_or_else(|| interpreter.to_vec()),
            working_dir: settings.working_dir.clone(),
            environment: settings.environment.clone(),
            timeout: settings
                .timeout_secs
                .map(Duration::from_secs)
                .or(default_timeout),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// What a finished process left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    /// Captured stdout, byte-for-byte apart from lossy UTF-8 decoding.
    pub stdout: String,
    /// Captured stderr. Never merged into `stdout`.
    pub stderr: String,
}

pub type InvokeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ExecOutput, InvocationError>> + Send + 'a>>;

/// Trait abstracting how a command is run.
///
/// Production code uses [`ShellInvoker`]; tests provide implementations that
/// record invocations and return canned results.
pub trait Invoker: Send + Sync {
    /// Run the invocation once. Resolves when the process exits, is killed
    /// by its timeout, fails to start, or `cancel` fires.
    fn invoke<'a>(
        &'a self,
        invocation: &'a Invocation,
        cancel: &'a CancellationToken,
    ) -> InvokeFuture<'a>;
}
