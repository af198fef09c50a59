use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::{config::Git, declare::PriceRecord, logging};

/// Publishes a ledger change to version control.
///
/// Each step returns an error when it did not succeed; nothing is retried.
#[async_trait]
pub trait PersistenceBackend {
    /// Initialises the working copy. Must be harmless when it already exists.
    async fn init(&self, dir: &Path) -> Result<()>;
    async fn stage(&self, dir: &Path, file: &str) -> Result<()>;
    async fn commit(&self, dir: &Path, message: &str) -> Result<()>;
    async fn push(&self, dir: &Path) -> Result<()>;
}

/// Runs init, stage, commit and push in that order.
///
/// The first failure stops the sequence. The line already appended to the ledger is
/// left in place, so the local file may end up ahead of the remote.
pub async fn persist<B>(backend: &B, dir: &Path, file: &str, record: &PriceRecord) -> Result<()>
where
    B: PersistenceBackend + Sync + ?Sized,
{
    backend.init(dir).await?;
    backend.stage(dir, file).await?;
    backend.commit(dir, &record.commit_message()).await?;
    backend.push(dir).await?;

    logging::info_file_async(format!(
        "Pushed {} in {}",
        record.commit_message(),
        dir.display()
    ));

    Ok(())
}

/// The `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    remote: Option<String>,
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>, remote: Option<String>) -> Self {
        Self {
            program: program.into(),
            remote: remote.filter(|r| !r.is_empty()),
        }
    }

    pub fn from_config(git: &Git) -> Self {
        Self::new(&git.program, Some(git.remote.clone()))
    }

    /// Runs one git step with `dir` as working directory; a non-zero exit is an error.
    async fn run(&self, step: &str, dir: &Path, args: &[&str]) -> Result<()> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|why| {
                anyhow!(
                    "git {}: failed to run {} because {:?}",
                    step,
                    self.program.display(),
                    why
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "git {}: {} {}",
                step,
                output.status,
                stderr.trim()
            ));
        }

        logging::info_file_async(format!("git {} in {}", args.join(" "), dir.display()));

        Ok(())
    }
}

#[async_trait]
impl PersistenceBackend for GitCli {
    async fn init(&self, dir: &Path) -> Result<()> {
        self.run("init", dir, &["init"]).await
    }

    async fn stage(&self, dir: &Path, file: &str) -> Result<()> {
        self.run("add", dir, &["add", file]).await
    }

    async fn commit(&self, dir: &Path, message: &str) -> Result<()> {
        self.run("commit", dir, &["commit", "-m", message]).await
    }

    async fn push(&self, dir: &Path) -> Result<()> {
        match &self.remote {
            Some(remote) => self.run("push", dir, &["push", remote.as_str()]).await,
            None => self.run("push", dir, &["push"]).await,
        }
    }
}
