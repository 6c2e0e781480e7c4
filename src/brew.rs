//! Delegation to the `brew` executable for the build/pour step.

use crate::error::{RekegError, Result};
use colored::Colorize;
use std::process::Command;

/// Check if brew is available
pub fn check_brew_available() -> bool {
    Command::new("brew")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Build the `brew` invocation for one step.
///
/// The child must not redo what the caller orchestrates itself: dependents,
/// cleanup and the confirmation prompt are turned off, as is auto-update.
pub fn brew_command(command: &str, args: &[&str], targets: &[String]) -> Command {
    let mut cmd = Command::new("brew");
    cmd.arg(command)
        .args(args)
        .args(targets)
        .env("HOMEBREW_NO_INSTALLED_DEPENDENTS_CHECK", "1")
        .env("HOMEBREW_NO_INSTALL_CLEANUP", "1")
        .env("HOMEBREW_NO_AUTO_UPDATE", "1")
        .env_remove("HOMEBREW_ASK");
    cmd
}

/// Run `brew <command> <args> <targets>`, failing unless it exits successfully
pub fn run_brew(command: &str, args: &[&str], targets: &[String]) -> Result<()> {
    if !check_brew_available() {
        println!(
            "  {} brew is not installed - cannot {} {}",
            "✗".red(),
            command,
            targets.join(" ").bold()
        );
        return Err(RekegError::BrewUnavailable);
    }

    println!(
        "  Delegating to {}...",
        format!("brew {} {}", command, targets.join(" ")).cyan()
    );
    tracing::debug!("brew {} {:?} {:?}", command, args, targets);

    let status = brew_command(command, args, targets).status()?;

    if status.success() {
        Ok(())
    } else {
        Err(RekegError::BrewFailed {
            command: command.to_string(),
            target: targets.join(" "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn test_brew_command_arguments_and_env() {
        let cmd = brew_command(
            "reinstall",
            &["--formula", "--verbose"],
            &["wget".to_string(), "jq".to_string()],
        );
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(
            args,
            vec![
                OsStr::new("reinstall"),
                OsStr::new("--formula"),
                OsStr::new("--verbose"),
                OsStr::new("wget"),
                OsStr::new("jq")
            ]
        );

        let envs: Vec<_> = cmd.get_envs().collect();
        assert!(envs.contains(&(
            OsStr::new("HOMEBREW_NO_INSTALLED_DEPENDENTS_CHECK"),
            Some(OsStr::new("1"))
        )));
        assert!(envs.contains(&(OsStr::new("HOMEBREW_ASK"), None)));
    }
}
