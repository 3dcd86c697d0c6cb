use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceConfig>,
}

/// Settings shared by every resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Argv prefix the command text is appended to.
    #[serde(default = "default_interpreter")]
    pub interpreter: Vec<String>,

    /// Timeout applied to resources that don't set their own.
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            default_timeout_secs: None,
        }
    }
}

/// A single `local_exec` resource declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceConfig {
    /// Script body handed to the interpreter. May span several lines.
    pub command: String,

    /// Command run when the resource is destroyed.
    #[serde(default)]
    pub on_destroy: Option<String>,

    /// Treat a nonzero exit code as an error.
    #[serde(default = "default_fail_if_nonzero")]
    pub fail_if_nonzero: bool,

    #[serde(flatten)]
    pub invocation: InvocationSettings,

    /// Keys no other field claimed. Must stay after `invocation` so the
    /// flattened settings take their keys first; rejected by validation.
    #[serde(flatten)]
    pub(crate) unknown: BTreeMap<String, toml::Value>,
}

impl ResourceConfig {
    /// A config with the given command and every other attribute defaulted.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            on_destroy: None,
            fail_if_nonzero: default_fail_if_nonzero(),
            invocation: InvocationSettings::default(),
            unknown: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_on_destroy(mut self, on_destroy: impl Into<String>) -> Self {
        self.on_destroy = Some(on_destroy.into());
        self
    }

    #[must_use]
    pub fn with_fail_if_nonzero(mut self, fail_if_nonzero: bool) -> Self {
        self.fail_if_nonzero = fail_if_nonzero;
        self
    }
}

/// How a command is run. Changing these never forces a rerun; they are
/// recorded in state so the destroy command runs the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationSettings {
    /// Working directory for the process. Inherited when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,

    /// Variables set on top of the inherited environment.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Per-resource interpreter override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,
}

// --- Defaults ---

pub fn default_interpreter() -> Vec<String> {
    if cfg!(windows) {
        vec!["cmd".to_string(), "/C".to_string()]
    } else {
        vec!["/bin/sh".to_string(), "-c".to_string()]
    }
}

pub(crate) fn default_fail_if_nonzero() -> bool {
    true
}
