use crate::error::{ExecError, Result};
use crate::resource::ResourceState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

pub const STATE_VERSION: u32 = 1;

/// On-disk record of every managed resource, keyed by resource name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Load state from `path`. A missing file is empty state.
    ///
    /// # Errors
    /// Returns `ExecError::Io` on read errors or `ExecError::StateFile` if the
    /// file is not valid state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no state file at {}; starting empty", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let state: StateFile =
            serde_json::from_str(&content).map_err(|e| ExecError::StateFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if state.version != STATE_VERSION {
            return Err(ExecError::StateFile {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported version {} (expected {STATE_VERSION})",
                    state.version
                ),
            });
        }

        Ok(state)
    }

    /// Write state to `path` via a temporary sibling file and a rename, so a
    /// crash never leaves a half-written file behind.
    ///
    /// # Errors
    /// Returns `ExecError::Json` or `ExecError::Io` on failure.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        debug!("saved {} resources to {}", self.resources.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::InvocationSettings;
    use uuid::Uuid;

    fn sample() -> StateFile {
        let mut state = StateFile::default();
        state.resources.insert(
            "multiline".to_string(),
            ResourceState {
                id: Uuid::new_v4(),
                command: "echo \"Line 1\"\necho \"Line 2\"\n".to_string(),
                exit_code: 0,
                output: "Line 1\nLine 2\n".to_string(),
                on_destroy: Some("echo bye".to_string()),
                fail_if_nonzero: true,
                invocation: InvocationSettings {
                    timeout_secs: Some(5),
                    ..InvocationSettings::default()
                },
            },
        );
        state
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(state, StateFile::default());
    }

    #[test]
    fn save_then_load_preserves_output_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("localexec.state.json");
        let state = sample();

        state.save(&path).unwrap();
        let loaded = StateFile::load(&path).unwrap();

        assert_eq!(loaded, state);
        assert_eq!(loaded.resources["multiline"].output, "Line 1\nLine 2\n");
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        sample().save(&path).unwrap();
        StateFile::default().save(&path).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("state.json")]);
        assert!(StateFile::load(&path).unwrap().resources.is_empty());
    }

    #[test]
    fn garbage_is_state_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            StateFile::load(&path),
            Err(ExecError::StateFile { .. })
        ));
    }

    #[test]
    fn unknown_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"version": 99, "resources": {}}"#).unwrap();
        let err = StateFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported version 99"));
    }
}
