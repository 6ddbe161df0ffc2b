//! Git CLI adapter for source-managed applications.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{CommandRunner, SourceControl};
use crate::domain::ProcessError;

pub const CLONE_TIMEOUT: Duration = Duration::from_secs(300);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(60);
pub const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);
pub const RESET_TIMEOUT: Duration = Duration::from_secs(30);

/// Git driven through its command-line client.
pub struct GitCli<R> {
    runner: R,
}

impl<R: CommandRunner> GitCli<R> {
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn git(&self, step: &'static str, args: &[&str], timeout: Duration) -> Result<()> {
        let output = self.runner.run_with_timeout("git", args, timeout).await?;
        if output.status.success() {
            return Ok(());
        }
        Err(ProcessError {
            step,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into())
    }
}

impl<R: CommandRunner> SourceControl for GitCli<R> {
    async fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        let dest = dest.to_string_lossy();
        tracing::info!(%url, %branch, "cloning repository");
        self.git("git clone", &["clone", "-b", branch, url, &dest], CLONE_TIMEOUT)
            .await
    }

    async fn fetch(&self, repo: &Path) -> Result<()> {
        let repo = repo.to_string_lossy();
        self.git("git fetch", &["-C", &repo, "fetch", "origin"], FETCH_TIMEOUT)
            .await
    }

    async fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        let repo = repo.to_string_lossy();
        self.git("git checkout", &["-C", &repo, "checkout", branch], CHECKOUT_TIMEOUT)
            .await
    }

    async fn reset_hard(&self, repo: &Path, branch: &str) -> Result<()> {
        let repo = repo.to_string_lossy();
        let target = format!("origin/{branch}");
        self.git("git reset", &["-C", &repo, "reset", "--hard", &target], RESET_TIMEOUT)
            .await
    }
}
