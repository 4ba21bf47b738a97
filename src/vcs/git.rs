use super::{Platform, Vcs};
use crate::error::CheckerError;
use std::path::Path;
use std::process::Command;

/// Runs the `git` binary found on `PATH`. Calls block until git exits.
#[derive(Debug, Clone)]
pub struct GitCli {
    platform: Platform,
}

impl GitCli {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<String, CheckerError> {
        let command = format!("git {}", args.join(" "));
        log::debug!("{}$ {}", dir.display(), command);

        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| CheckerError::Vcs {
                command: command.clone(),
                status: "not started".to_string(),
                output: e.to_string(),
            })?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            return Err(CheckerError::Vcs {
                command,
                status: output.status.to_string(),
                output: text.trim().to_string(),
            });
        }

        Ok(self
            .platform
            .clean_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(Platform::current())
    }
}

impl Vcs for GitCli {
    fn clone_repo(&self, parent: &Path, url: &str) -> Result<(), CheckerError> {
        self.run(parent, &["clone", url]).map(drop)
    }

    fn discard_changes(&self, repo: &Path) -> Result<(), CheckerError> {
        self.run(repo, &["clean", "-fd"])?;
        self.run(repo, &["reset", "--hard", "HEAD"])?;
        self.run(repo, &["checkout", "."]).map(drop)
    }

    fn pull(&self, repo: &Path) -> Result<(), CheckerError> {
        self.run(repo, &["pull"]).map(drop)
    }

    fn checkout(&self, repo: &Path, reference: &str) -> Result<(), CheckerError> {
        self.run(repo, &["checkout", reference]).map(drop)
    }

    fn head_commit(&self, repo: &Path) -> Result<String, CheckerError> {
        self.run(repo, &["show", "--no-patch", "--pretty=format:%H"])
    }

    fn commit_date(&self, repo: &Path, reference: &str) -> Result<String, CheckerError> {
        self.run(repo, &["show", "-s", "--format=%cI", reference])
    }
}
