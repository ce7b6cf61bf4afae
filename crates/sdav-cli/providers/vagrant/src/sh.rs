use std::process::Command;

use sdav_core::error::SdavError;

/// Runs a shell command and waits for completion
///
/// The command string is executed via `sh -c` with the standard streams
/// inherited, so interactive commands such as `vagrant ssh` work and
/// vagrant's own progress output reaches the terminal.
///
/// # Arguments
///
/// * `cmd` - The shell command to execute, usually built by [`Vagrant`]
///
/// # Returns
///
/// Returns `Ok(())` if the command exits with status zero, or
/// `SdavError::Command` if it could not be spawned or exited non-zero.
/// The error message carries the command and its exit code.
///
/// [`Vagrant`]: crate::Vagrant
pub fn run(cmd: &str) -> Result<(), SdavError> {
    tracing::debug!(command = cmd, "running shell command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .status()
        .map_err(|e| SdavError::Command(format!("Failed to execute command: {}", e)))?;

    if !status.success() {
        return Err(SdavError::Command(format!(
            "`{}` failed with exit code: {:?}",
            cmd,
            status.code()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_commands_are_ok() {
        assert!(run("true").is_ok());
    }

    #[test]
    fn failing_commands_report_their_exit_code() {
        let err = run("exit 3").unwrap_err();
        assert!(err.to_string().contains("Some(3)"));
    }
}
