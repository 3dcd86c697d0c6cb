//! The `local_exec` resource lifecycle.
//!
//! A host drives a resource through the four entry points of [`Lifecycle`].
//! [`LocalExec`] implements them on top of an [`Invoker`] and the exit code
//! policy in [`crate::policy`]:
//!
//! - create runs `command` and records the result, or leaves nothing behind
//!   when the run fails;
//! - read hands back the stored state without running anything;
//! - update runs `command` again only when its text changed (see
//!   [`diff::needs_rerun`]), otherwise it re-checks the stored exit code
//!   against the new policy;
//! - destroy runs `on_destroy` once if set and always lets the state go.

pub mod diff;
pub mod state;

use crate::config::schema::{default_interpreter, InvocationSettings, ResourceConfig, Settings};
use crate::error::{ExecError, Result};
use crate::invoker::{ExecOutput, Invocation, Invoker, ShellInvoker};
use crate::policy::{self, Verdict};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use diff::{needs_rerun, Plan};
pub use state::ResourceState;

/// Entry points a host calls to manage one resource.
///
/// Calls for the same resource must not overlap; calls for different
/// resources may run concurrently.
pub trait Lifecycle {
    /// Run the configured command and build the initial state.
    ///
    /// # Errors
    /// `ExecError::Invocation` if the command could not run, or
    /// `ExecError::PolicyFailure` if it exited nonzero under
    /// `fail_if_nonzero`. No state exists afterwards in either case.
    fn create(&self, config: &ResourceConfig) -> impl Future<Output = Result<ResourceState>> + Send;

    /// Return the stored state. Never runs anything.
    fn read(&self, state: ResourceState) -> ResourceState;

    /// Move `prior` to match `config`.
    ///
    /// # Errors
    /// Same as [`Lifecycle::create`]. On error `prior` is still the state of
    /// record.
    fn update(
        &self,
        prior: &ResourceState,
        config: &ResourceConfig,
    ) -> impl Future<Output = Result<ResourceState>> + Send;

    /// Remove the resource, running its destroy command if one is recorded.
    ///
    /// # Errors
    /// `ExecError::DestroyCommand` if the destroy command failed. The state
    /// is gone either way.
    fn destroy(&self, state: ResourceState) -> impl Future<Output = Result<()>> + Send;
}

/// Lifecycle controller for `local_exec` resources.
#[derive(Debug, Clone)]
pub struct LocalExec<I = ShellInvoker> {
    invoker: I,
    interpreter: Vec<String>,
    default_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl LocalExec<ShellInvoker> {
    /// Controller that runs commands through [`ShellInvoker`].
    pub fn new() -> Self {
        Self::with_invoker(ShellInvoker)
    }
}

impl Default for LocalExec<ShellInvoker> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Invoker> LocalExec<I> {
    pub fn with_invoker(invoker: I) -> Self {
        Self {
            invoker,
            interpreter: default_interpreter(),
            default_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Controller using the global interpreter and timeout from `settings`.
    pub fn from_settings(invoker: I, settings: &Settings) -> Self {
        Self {
            interpreter: settings.interpreter.clone(),
            default_timeout: settings.default_timeout_secs.map(Duration::from_secs),
            ..Self::with_invoker(invoker)
        }
    }

    /// Kill any in-flight command when `cancel` fires.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn invocation(&self, command: &str, settings: &InvocationSettings) -> Invocation {
        Invocation::from_settings(command, settings, &self.interpreter, self.default_timeout)
    }

    /// Run `config.command` once and apply the exit code policy.
    async fn run_command(&self, config: &ResourceConfig) -> Result<ExecOutput> {
        let invocation = self.invocation(&config.command, &config.invocation);
        info!(command = %config.command, "running command");
        let result = self.invoker.invoke(&invocation, &self.cancel).await?;

        match policy::evaluate(result.exit_code, config.fail_if_nonzero) {
            Verdict::Success => {
                if result.exit_code != 0 {
                    info!(
                        exit_code = result.exit_code,
                        "command exited nonzero; allowed by fail_if_nonzero = false"
                    );
                }
                Ok(result)
            }
            Verdict::Failed => Err(ExecError::PolicyFailure {
                command: config.command.clone(),
                exit_code: result.exit_code,
                output: result.stdout,
                stderr: result.stderr,
            }),
        }
    }
}

impl<I: Invoker> Lifecycle for LocalExec<I> {
    async fn create(&self, config: &ResourceConfig) -> Result<ResourceState> {
        let result = self.run_command(config).await?;
        Ok(ResourceState::from_execution(Uuid::new_v4(), config, result))
    }

    fn read(&self, state: ResourceState) -> ResourceState {
        state
    }

    async fn update(&self, prior: &ResourceState, config: &ResourceConfig) -> Result<ResourceState> {
        if needs_rerun(&prior.command, &config.command) {
            debug!(id = %prior.id, "command changed; rerunning");
            let result = self.run_command(config).await?;
            return Ok(ResourceState::from_execution(prior.id, config, result));
        }

        // Same command: the stored result stands, but a policy change may
        // turn it into a failure.
        if policy::evaluate(prior.exit_code, config.fail_if_nonzero) == Verdict::Failed {
            return Err(ExecError::PolicyFailure {
                command: prior.command.clone(),
                exit_code: prior.exit_code,
                output: prior.output.clone(),
                stderr: String::new(),
            });
        }

        debug!(id = %prior.id, "command unchanged; updating settings in place");
        Ok(prior.with_settings(config))
    }

    async fn destroy(&self, state: ResourceState) -> Result<()> {
        let Some(command) = state.on_destroy.as_deref() else {
            debug!(id = %state.id, "no on_destroy command; dropping state");
            return Ok(());
        };

        let invocation = self.invocation(command, &state.invocation);
        info!(id = %state.id, command = %command, "running destroy command");

        let reason = match self.invoker.invoke(&invocation, &self.cancel).await {
            Ok(result) if policy::evaluate(result.exit_code, state.fail_if_nonzero).is_success() => {
                return Ok(());
            }
            Ok(result) => {
                let mut reason = format!("exited with status {}", result.exit_code);
                if !result.stderr.is_empty() {
                    reason.push_str(": ");
                    reason.push_str(result.stderr.trim_end());
                }
                reason
            }
            Err(e) => e.to_string(),
        };

        warn!(id = %state.id, "destroy command failed, state removed anyway: {reason}");
        Err(ExecError::DestroyCommand {
            command: command.to_string(),
            reason,
        })
    }
}
