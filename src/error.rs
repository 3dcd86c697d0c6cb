use std::path::PathBuf;
use std::time::Duration;

/// Central error type for localexec.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("config error: {0}")]
    Config(String),

    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("command exited with status {exit_code}: {command}{}", diagnostics(.output, .stderr))]
    PolicyFailure {
        command: String,
        exit_code: i32,
        output: String,
        stderr: String,
    },

    #[error("destroy command failed: {command}: {reason}")]
    DestroyCommand { command: String, reason: String },

    #[error("state file error: {path}: {message}")]
    StateFile { path: PathBuf, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures to run a command at all, as opposed to a command that ran and
/// exited nonzero.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("failed to start `{interpreter}`: {source}")]
    Spawn {
        interpreter: String,
        source: std::io::Error,
    },

    #[error("IO error while running command: {0}")]
    Io(#[from] std::io::Error),

    #[error("command timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("command cancelled")]
    Cancelled,
}

fn diagnostics(output: &str, stderr: &str) -> String {
    let mut text = String::new();
    if !output.is_empty() {
        text.push_str("\nstdout:\n");
        text.push_str(output.trim_end());
    }
    if !stderr.is_empty() {
        text.push_str("\nstderr:\n");
        text.push_str(stderr.trim_end());
    }
    text
}

pub type Result<T> = std::result::Result<T, ExecError>;
