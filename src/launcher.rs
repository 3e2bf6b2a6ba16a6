//! Fire-and-forget process launching.
//!
//! The coordinator never observes exit codes; a launch succeeds as soon as the
//! OS accepts the spawn.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Starts a shell command line as a detached process.
pub trait Launcher: Send + Sync {
    fn launch(&self, command: &str) -> Result<()>;
}

/// Which launcher the server uses for broker and simulator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LauncherKind {
    /// Open each command in a new terminal window (Windows, macOS).
    #[default]
    Terminal,
    /// Run each command headless through the platform shell.
    Shell,
}

impl LauncherKind {
    pub fn build(self) -> Box<dyn Launcher> {
        match self {
            LauncherKind::Terminal => Box::new(TerminalLauncher),
            LauncherKind::Shell => Box::new(ShellLauncher),
        }
    }
}

/// Build `cd <dir> && <command>`.
pub fn in_dir(dir: &Path, command: &str) -> String {
    format!("cd {} && {}", dir.display(), command)
}

/// Opens a new terminal window per command so each process gets its own console.
pub struct TerminalLauncher;

impl TerminalLauncher {
    fn command(command: &str) -> Result<Command> {
        if cfg!(target_os = "windows") {
            let mut cmd = Command::new("cmd.exe");
            cmd.args(["/c", "start", "cmd.exe", "/c", command]);
            Ok(cmd)
        } else if cfg!(target_os = "macos") {
            let mut cmd = Command::new("osascript");
            cmd.args([
                "-e",
                r#"tell application "Terminal" to activate"#,
                "-e",
                &format!(r#"tell application "Terminal" to do script "{}""#, command),
            ]);
            Ok(cmd)
        } else {
            bail!("unsupported platform: {}", std::env::consts::OS)
        }
    }
}

impl Launcher for TerminalLauncher {
    fn launch(&self, command: &str) -> Result<()> {
        let mut cmd = Self::command(command)?;
        tracing::info!(command, "running command in new terminal");
        cmd.spawn()
            .with_context(|| format!("failed to start `{command}`"))?;
        Ok(())
    }
}

/// Runs commands without a window, output discarded.
pub struct ShellLauncher;

impl Launcher for ShellLauncher {
    fn launch(&self, command: &str) -> Result<()> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd.exe");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        tracing::info!(command, "running command");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start `{command}`"))?;
        Ok(())
    }
}
