pub mod schema;

use crate::error::{ExecError, Result};
use schema::AppConfig;
use std::path::Path;

/// Load and parse configuration from a TOML file.
///
/// # Errors
/// Returns `ExecError::ConfigNotFound` if the file doesn't exist,
/// `ExecError::Io` on read errors, `ExecError::TomlParse` on syntax errors,
/// or `ExecError::Config` on validation failures.
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(ExecError::ConfigNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse and validate configuration text.
///
/// # Errors
/// Returns `ExecError::TomlParse` on syntax errors or `ExecError::Config`
/// on validation failures.
pub fn parse(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Validate config constraints.
fn validate(config: &AppConfig) -> Result<()> {
    if config.settings.interpreter.is_empty() {
        return Err(ExecError::Config(
            "settings.interpreter must not be empty".to_string(),
        ));
    }
    if config.settings.default_timeout_secs == Some(0) {
        return Err(ExecError::Config(
            "settings.default_timeout_secs must be greater than 0".to_string(),
        ));
    }

    for (name, resource) in &config.resources {
        if !resource.unknown.is_empty() {
            let keys: Vec<&str> = resource.unknown.keys().map(String::as_str).collect();
            return Err(ExecError::Config(format!(
                "resource '{name}': unknown attribute(s): {}",
                keys.join(", ")
            )));
        }
        if resource.command.trim().is_empty() {
            return Err(ExecError::Config(format!(
                "resource '{name}': command must not be empty"
            )));
        }
        if let Some(on_destroy) = &resource.on_destroy {
            if on_destroy.trim().is_empty() {
                return Err(ExecError::Config(format!(
                    "resource '{name}': on_destroy must not be empty when set"
                )));
            }
        }
        if resource.invocation.timeout_secs == Some(0) {
            return Err(ExecError::Config(format!(
                "resource '{name}': timeout_secs must be greater than 0"
            )));
        }
        if let Some(interpreter) = &resource.invocation.interpreter {
            if interpreter.is_empty() {
                return Err(ExecError::Config(format!(
                    "resource '{name}': interpreter must not be empty"
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_has_no_resources() {
        let config = parse("").unwrap();
        assert!(config.resources.is_empty());
    }

    #[test]
    fn blank_command_rejected() {
        let err = parse("[resources.a]\ncommand = \"   \"\n").unwrap_err();
        assert!(matches!(err, ExecError::Config(msg) if msg.contains("'a'")));
    }

    #[test]
    fn blank_on_destroy_rejected() {
        let err = parse("[resources.a]\ncommand = \"true\"\non_destroy = \"\"\n").unwrap_err();
        assert!(matches!(err, ExecError::Config(msg) if msg.contains("on_destroy")));
    }

    #[test]
    fn misspelled_attribute_rejected() {
        let err = parse("[resources.a]\ncommand = \"true\"\non_destory = \"echo bye\"\n")
            .unwrap_err();
        assert!(
            matches!(err, ExecError::Config(msg) if msg == "resource 'a': unknown attribute(s): on_destory")
        );
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = parse("[resources.a]\ncommand = \"true\"\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ExecError::Config(msg) if msg.contains("timeout_secs")));
    }

    #[test]
    fn empty_interpreter_rejected() {
        let err = parse("[settings]\ninterpreter = []\n").unwrap_err();
        assert!(matches!(err, ExecError::Config(_)));
    }

    #[test]
    fn syntax_error_is_toml_error() {
        let err = parse("[resources.a\ncommand = 1").unwrap_err();
        assert!(matches!(err, ExecError::TomlParse(_)));
    }

    #[test]
    fn missing_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = load(&path).unwrap_err();
        assert!(matches!(err, ExecError::ConfigNotFound(p) if p == path));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("localexec.toml");
        std::fs::write(&path, "[resources.basic]\ncommand = \"echo hi\"\n").unwrap();
        let config = load(&path).unwrap();
        assert_eq!(config.resources["basic"].command, "echo hi");
    }
}
