use std::process::{ExitStatus, Stdio};

use tokio::{process::Command, task::JoinHandle};

use wal_core::{errors::Error, ports::ChatOpener, Result};

/// Opens the chat link with the desktop's default handler.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemOpener;

impl ChatOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let _reaper = launch(platform_command(url))?;
        tracing::debug!(url, "chat link handed to the system");
        Ok(())
    }
}

/// Spawn the handler detached from our stdio and reap it in the background,
/// so a long shell session leaves no zombies.
fn launch(mut cmd: Command) -> Result<JoinHandle<Option<ExitStatus>>> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let mut child = cmd.spawn().map_err(Error::Io)?;
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => {
                if !status.success() {
                    tracing::warn!(%status, "url handler exited with failure");
                }
                Some(status)
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to wait for url handler");
                None
            }
        }
    }))
}

/// `--print`: write the link to stdout instead of launching anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrintOpener;

impl ChatOpener for PrintOpener {
    fn open(&self, url: &str) -> Result<()> {
        println!("{url}");
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(url);
    cmd
}

#[cfg(target_os = "windows")]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("cmd");
    // Empty title argument, otherwise `start` treats the URL as the title.
    cmd.args(["/C", "start", "", url]);
    cmd
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_command(url: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(url);
    cmd
}
