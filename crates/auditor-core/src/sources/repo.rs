//! Repository acquisition with scoped cleanup.
//!
//! A URL is cloned into a fresh temporary directory that lives exactly as
//! long as the returned [`RepoHandle`]. Any failure (spawn error, non-zero
//! exit, timeout) drops the directory before the error is returned, so a
//! handle never points at a partially cloned tree.
//!
//! On Unix, git runs in its own process group; a timeout kills the whole
//! group, including the transport helpers git forks.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::errors::AcquireError;

/// Cap on captured git stderr.
const STDERR_LIMIT: usize = 4096;

#[derive(Debug, Clone)]
pub struct CloneOptions {
    pub timeout: Duration,
    pub depth: u32,
    /// Parent of the `auditor_repo_*` work directories; the system temp dir if unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            depth: 50,
            scratch_dir: None,
        }
    }
}

/// Filesystem handle to a checked-out tree.
#[derive(Debug)]
pub struct RepoHandle {
    root: PathBuf,
    origin: String,
    // Dropped with the handle; removes the clone.
    workdir: Option<TempDir>,
}

impl RepoHandle {
    /// Use an existing directory in place. It is never deleted.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let root = path.into();
        Self {
            origin: root.display().to_string(),
            root,
            workdir: None,
        }
    }

    pub(crate) fn cloned(origin: impl Into<String>, root: PathBuf, workdir: TempDir) -> Self {
        Self {
            root,
            origin: origin.into(),
            workdir: Some(workdir),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// What the caller asked for: URL or local path.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn is_temporary(&self) -> bool {
        self.workdir.is_some()
    }
}

/// Resolve `spec` to a checked-out tree: an existing directory, or a git URL.
pub async fn acquire_repository(
    spec: &str,
    opts: &CloneOptions,
) -> Result<RepoHandle, AcquireError> {
    if tokio::fs::metadata(spec)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        tracing::debug!(path = %spec, "using local repository");
        return Ok(RepoHandle::local(spec));
    }

    let mut builder = tempfile::Builder::new();
    builder.prefix("auditor_repo_");
    let workdir = match &opts.scratch_dir {
        Some(dir) => builder.tempdir_in(dir),
        None => builder.tempdir(),
    }
    .map_err(AcquireError::WorkDir)?;
    let dest = workdir.path().join("checkout");

    let mut cmd = Command::new("git");
    cmd.arg("clone")
        .arg("--quiet")
        .arg("--depth")
        .arg(opts.depth.to_string())
        .arg(spec)
        .arg(&dest)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    let mut child = cmd.spawn().map_err(AcquireError::GitUnavailable)?;

    let stderr_pipe = child.stderr.take();
    let wait = async {
        let mut stderr = Vec::new();
        if let Some(mut pipe) = stderr_pipe {
            pipe.read_to_end(&mut stderr).await?;
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, stderr))
    };
    let waited = timeout(opts.timeout, wait).await;

    // `workdir` is dropped on every early return below.
    let (status, stderr) = match waited {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => return Err(AcquireError::GitUnavailable(e)),
        Err(_) => {
            terminate(&mut child).await;
            tracing::warn!(
                url = %spec,
                timeout_ms = opts.timeout.as_millis() as u64,
                "git clone timed out; process group killed"
            );
            return Err(AcquireError::CloneTimeout {
                url: spec.to_string(),
                timeout: opts.timeout,
            });
        }
    };

    if !status.success() {
        let mut stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        truncate_on_char_boundary(&mut stderr, STDERR_LIMIT);
        return Err(AcquireError::CloneFailed {
            url: spec.to_string(),
            stderr,
        });
    }

    tracing::info!(url = %spec, path = %dest.display(), "repository cloned");
    Ok(RepoHandle::cloned(spec, dest, workdir))
}

/// Kill the child and everything in its process group, then reap it.
async fn terminate(child: &mut Child) {
    if let Some(pid) = child.id() {
        kill_group(pid);
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "git already exited");
    }
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        tracing::debug!(pgid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}

fn truncate_on_char_boundary(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    s.truncate(cut);
}
