mod git;

pub use git::GitCli;

use crate::error::CheckerError;
use std::path::Path;

/// Operations the checker needs from the version-control tool.
pub trait Vcs {
    /// Clone `url` into a new directory under `parent`.
    fn clone_repo(&self, parent: &Path, url: &str) -> Result<(), CheckerError>;

    /// Drop untracked files and local edits, hard-reset to `HEAD`.
    fn discard_changes(&self, repo: &Path) -> Result<(), CheckerError>;

    fn pull(&self, repo: &Path) -> Result<(), CheckerError>;

    fn checkout(&self, repo: &Path, reference: &str) -> Result<(), CheckerError>;

    /// Full hash of the commit currently checked out.
    fn head_commit(&self, repo: &Path) -> Result<String, CheckerError>;

    /// Committer date of `reference` in strict ISO 8601 (`%cI`).
    fn commit_date(&self, repo: &Path, reference: &str) -> Result<String, CheckerError>;
}

/// How a platform's tool output has to be cleaned before comparing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    /// Wraps single-value output in a pair of quotes
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn clean_output(self, raw: &str) -> String {
        let trimmed = raw.trim();
        match self {
            Platform::Unix => trimmed.to_string(),
            Platform::Windows => strip_wrapping_quotes(trimmed).to_string(),
        }
    }
}

fn strip_wrapping_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
