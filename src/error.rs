use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("Missing file '{}'. {remedy}", path.display())]
    MissingControlFile { path: PathBuf, remedy: &'static str },

    #[error("Couldn't read input file '{}'", path.display())]
    MissingInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Submission folder '{}' not found", .0.display())]
    SubmissionFolderNotFound(PathBuf),

    #[error("Malformed submission folder name '{0}', expected '<name>(<upload id>)'")]
    MalformedFolderName(String),

    #[error("No roster entry for student '{0}'")]
    UnknownStudent(String),

    #[error("Couldn't find team for '{0}'")]
    UnknownTeam(String),

    #[error("`{command}` exited with {status}: {output}")]
    Vcs {
        command: String,
        status: String,
        output: String,
    },

    #[error("Malformed timestamp '{0}'")]
    MalformedTimestamp(String),

    #[error("Malformed deadline '{0}', expected 'YYYY-MM-DD HH:MM:SS'")]
    MalformedDeadline(String),
}

pub const RERUN_ROSTER: &str = "Run the `roster` subcommand first.";
pub const RERUN_TEAMS: &str = "Run the `teams` subcommand first.";
