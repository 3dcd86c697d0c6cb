use super::{ExecOutput, Invocation, InvokeFuture, Invoker};
use crate::error::InvocationError;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs commands through the configured interpreter (`/bin/sh -c` by
/// default). Holds no state, so one instance can serve any number of
/// concurrent invocations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellInvoker;

impl Invoker for ShellInvoker {
    fn invoke<'a>(
        &'a self,
        invocation: &'a Invocation,
        cancel: &'a CancellationToken,
    ) -> InvokeFuture<'a> {
        Box::pin(execute(invocation, cancel))
    }
}

/// Execute one invocation, capturing stdout and stderr separately.
///
/// # Errors
/// Returns `InvocationError::Spawn` if the interpreter cannot be started,
/// `InvocationError::Timeout` if the deadline passes first, or
/// `InvocationError::Cancelled` if `cancel` fires. In the last two cases the
/// child is killed.
pub async fn execute(
    invocation: &Invocation,
    cancel: &CancellationToken,
) -> Result<ExecOutput, InvocationError> {
    let Some((program, args)) = invocation.interpreter.split_first() else {
        return Err(InvocationError::Spawn {
            interpreter: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty interpreter"),
        });
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .arg(&invocation.command)
        .envs(&invocation.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &invocation.working_dir {
        cmd.current_dir(dir);
    }
    // Own process group, so a kill reaches everything the script started.
    #[cfg(unix)]
    cmd.process_group(0);

    debug!(interpreter = %program, command = %invocation.command, "spawning process");
    let child = cmd.spawn().map_err(|source| InvocationError::Spawn {
        interpreter: program.clone(),
        source,
    })?;
    let pid = child.id();

    let deadline = async {
        match invocation.timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };

    // Dropping the wait future drops the child, and kill_on_drop reaps it.
    let output = tokio::select! {
        output = child.wait_with_output() => output?,
        () = deadline => {
            let limit = invocation.timeout.unwrap_or_default();
            warn!(command = %invocation.command, "command timed out after {limit:?}; killing process group");
            kill_process_group(pid);
            return Err(InvocationError::Timeout(limit));
        }
        () = cancel.cancelled() => {
            info!(command = %invocation.command, "cancellation requested; killing process group");
            kill_process_group(pid);
            return Err(InvocationError::Cancelled);
        }
    };

    let exit_code = exit_code(output.status);
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !stderr.is_empty() {
        debug!("command stderr: {stderr}");
    }
    info!(exit_code, "command exited");

    Ok(ExecOutput {
        exit_code,
        stdout,
        stderr,
    })
}

/// SIGKILL the process group led by `pid`. The interpreter itself is also
/// covered by kill_on_drop; this reaches its descendants.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, "killpg failed (group already gone?): {e}");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Exit code of a finished process. A process killed by a signal reports
/// `128 + signal`, matching what a shell would show.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
