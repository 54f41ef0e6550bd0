//! Git versioning provider.
//!
//! The storage directory IS a Git working tree: every mutation stages the
//! service's YAML file and commits with the acting user as author. History
//! reads parse `git log` for the single file, so per-service history falls
//! out of the working-tree layout for free.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;

use dashops_core::UserContext;

use crate::error::{CatalogError, Result};
use crate::service::Service;

use super::simple::HISTORY_DIR;
use super::{
    change_message, deletion_message, ChangeAction, FieldChange, ServiceChange, VersioningProvider,
};

/// Committer identity used when the acting user is only the author.
const COMMITTER_NAME: &str = "dash-ops";
const COMMITTER_EMAIL: &str = "dash-ops@localhost";

/// Seed `.gitignore` written on initialization.
const GITIGNORE: &str = "*.tmp\n.history/\n";

/// Change log backed by a Git working tree.
#[derive(Debug, Clone)]
pub struct GitProvider {
    directory: PathBuf,
}

impl GitProvider {
    /// Creates a provider operating on `directory` as a working tree.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// Runs a git subcommand in the storage directory, returning stdout.
    async fn run_git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.directory)
            .output()
            .await
            .map_err(|e| CatalogError::storage("git", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CatalogError::Storage {
                operation: "git",
                message: format!("git {} failed: {}", args.first().unwrap_or(&""), stderr.trim()),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| CatalogError::Serialization {
            message: format!("git output is not valid UTF-8: {e}"),
        })
    }

    async fn commit(&self, file: &str, author: &str, message: &str) -> Result<()> {
        self.run_git(&["add", "-A", file]).await?;

        let result = self
            .run_git(&["commit", "--author", author, "-m", message])
            .await;
        match result {
            Ok(_) => Ok(()),
            // A no-op mutation (identical bytes) leaves nothing staged; the
            // storage write already succeeded, so history stays silent.
            Err(CatalogError::Storage { message, .. })
                if message.contains("nothing to commit")
                    || message.contains("nothing added to commit") =>
            {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn parse_log(stdout: &str) -> Vec<ServiceChange> {
        stdout
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(5, '|');
                let id = parts.next()?;
                let author = parts.next()?;
                let email = parts.next()?;
                let date = parts.next()?;
                let message = parts.next().unwrap_or("");
                let timestamp = parse_git_date(date)?;
                Some(ServiceChange {
                    id: id.to_string(),
                    author: author.to_string(),
                    email: email.to_string(),
                    timestamp,
                    message: message.to_string(),
                    field_changes: Vec::new(),
                })
            })
            .collect()
    }
}

/// Parses `--date=iso` output, e.g. `2024-05-01 12:30:00 +0000`.
fn parse_git_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S %z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl VersioningProvider for GitProvider {
    async fn initialize(&self) -> Result<()> {
        if self.directory.join(HISTORY_DIR).exists() {
            return Err(CatalogError::Conflict {
                message: format!(
                    "{} already holds simple versioning state; refusing to switch providers",
                    self.directory.display()
                ),
            });
        }

        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CatalogError::storage("initialize git", e))?;

        if !self.directory.join(".git").exists() {
            self.run_git(&["init"]).await?;
            self.run_git(&["symbolic-ref", "HEAD", "refs/heads/main"])
                .await?;
        }
        self.run_git(&["config", "init.defaultBranch", "main"]).await?;
        self.run_git(&["config", "user.name", COMMITTER_NAME]).await?;
        self.run_git(&["config", "user.email", COMMITTER_EMAIL])
            .await?;

        let gitignore = self.directory.join(".gitignore");
        if !gitignore.exists() {
            tokio::fs::write(&gitignore, GITIGNORE)
                .await
                .map_err(|e| CatalogError::storage("initialize git", e))?;
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn record_change(
        &self,
        service: &Service,
        user: &UserContext,
        action: ChangeAction,
        _changes: &[FieldChange],
    ) -> Result<()> {
        let file = format!("{}.yaml", service.metadata.name);
        let message = change_message(service, user, action);
        self.commit(&file, &user.author(), &message).await
    }

    async fn record_deletion(&self, name: &str, user: &UserContext) -> Result<()> {
        let file = format!("{name}.yaml");
        let message = deletion_message(name, user);
        self.commit(&file, &user.author(), &message).await
    }

    async fn service_history(&self, name: &str) -> Result<Vec<ServiceChange>> {
        let file = format!("{name}.yaml");
        let stdout = self
            .run_git(&[
                "log",
                "--pretty=format:%H|%an|%ae|%ad|%s",
                "--date=iso",
                "--",
                &file,
            ])
            .await?;
        Ok(Self::parse_log(&stdout))
    }
}
