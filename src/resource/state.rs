use crate::config::schema::{InvocationSettings, ResourceConfig};
use crate::invoker::ExecOutput;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted record of a resource.
///
/// `output` and `exit_code` always come from the last run of `command`. The
/// remaining fields are settings that can change without a rerun and are kept
/// so the destroy command runs with the configuration that was last applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: Uuid,
    pub command: String,
    pub exit_code: i32,
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_destroy: Option<String>,

    #[serde(default = "crate::config::schema::default_fail_if_nonzero")]
    pub fail_if_nonzero: bool,

    #[serde(flatten)]
    pub invocation: InvocationSettings,
}

impl ResourceState {
    /// Assemble a fresh record from a successful run of `config.command`.
    pub(crate) fn from_execution(id: Uuid, config: &ResourceConfig, result: ExecOutput) -> Self {
        Self {
            id,
            command: config.command.clone(),
            exit_code: result.exit_code,
            output: result.stdout,
            on_destroy: config.on_destroy.clone(),
            fail_if_nonzero: config.fail_if_nonzero,
            invocation: config.invocation.clone(),
        }
    }

    /// Copy the in-place settings from `config`, keeping the recorded result.
    #[must_use]
    pub(crate) fn with_settings(&self, config: &ResourceConfig) -> Self {
        Self {
            on_destroy: config.on_destroy.clone(),
            fail_if_nonzero: config.fail_if_nonzero,
            invocation: config.invocation.clone(),
            ..self.clone()
        }
    }

    /// True when every non-command attribute already matches `config`.
    pub fn settings_match(&self, config: &ResourceConfig) -> bool {
        self.on_destroy == config.on_destroy
            && self.fail_if_nonzero == config.fail_if_nonzero
            && self.invocation == config.invocation
    }
}
