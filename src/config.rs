use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const STUDENT_RECORDS_FILENAME: &str = "student_records.json";
pub const STUDENT_ALIASES_FILENAME: &str = "student_aliases.json";
pub const TEAM_RECORDS_FILENAME: &str = "student_records_teams.json";
pub const TEAM_MEMBERS_FILENAME: &str = "student_records_team_members.json";

#[derive(Debug, Clone)]
pub struct Config {
    /// Prepended to every repository and checkout directory name
    pub folder_prefix: String,
    /// Organization the student repositories live under
    pub git_context: String,
    pub git_host: String,
    pub repos_dir: PathBuf,
    pub data_dir: PathBuf,
    pub timestamp_filename: String,
    pub pull: bool,
}

/// Optional YAML course file; every key may be left out.
#[derive(Debug, Default, Deserialize)]
struct CourseFile {
    folder_prefix: Option<String>,
    git_context: Option<String>,
    git_host: Option<String>,
    repos_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    timestamp_filename: Option<String>,
    pull: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folder_prefix: "6300Fall17".to_string(),
            git_context: "gt-omscs-se-2017fall".to_string(),
            git_host: "github.gatech.edu".to_string(),
            repos_dir: PathBuf::from("student_repo"),
            data_dir: PathBuf::from("."),
            timestamp_filename: "timestamp.txt".to_string(),
            pull: true,
        }
    }
}

impl Config {
    pub fn load(course_file: Option<&Path>) -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let mut config = Config::default();

        if let Some(path) = course_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read course file {}", path.display()))?;
            let file: CourseFile = serde_yaml::from_str(&text)
                .with_context(|| format!("Failed to parse course file {}", path.display()))?;
            config.apply(file);
        }

        config.apply(CourseFile {
            folder_prefix: env::var("COURSE_FOLDER_PREFIX").ok(),
            git_context: env::var("COURSE_GIT_CONTEXT").ok(),
            git_host: env::var("COURSE_GIT_HOST").ok(),
            repos_dir: env::var_os("COURSE_REPOS_DIR").map(PathBuf::from),
            data_dir: env::var_os("COURSE_DATA_DIR").map(PathBuf::from),
            timestamp_filename: env::var("COURSE_TIMESTAMP_FILENAME").ok(),
            pull: None,
        });

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, file: CourseFile) {
        if let Some(v) = file.folder_prefix {
            self.folder_prefix = v;
        }
        if let Some(v) = file.git_context {
            self.git_context = v;
        }
        if let Some(v) = file.git_host {
            self.git_host = v;
        }
        if let Some(v) = file.repos_dir {
            self.repos_dir = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.timestamp_filename {
            self.timestamp_filename = v;
        }
        if let Some(v) = file.pull {
            self.pull = v;
        }
    }

    fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("folder_prefix", &self.folder_prefix),
            ("git_context", &self.git_context),
            ("git_host", &self.git_host),
            ("timestamp_filename", &self.timestamp_filename),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("{} is empty", key);
            }
        }
        Ok(())
    }

    pub fn student_records_path(&self) -> PathBuf {
        self.data_dir.join(STUDENT_RECORDS_FILENAME)
    }

    pub fn student_aliases_path(&self) -> PathBuf {
        self.data_dir.join(STUDENT_ALIASES_FILENAME)
    }

    pub fn team_records_path(&self) -> PathBuf {
        self.data_dir.join(TEAM_RECORDS_FILENAME)
    }

    pub fn team_members_path(&self) -> PathBuf {
        self.data_dir.join(TEAM_MEMBERS_FILENAME)
    }

    /// Local checkout for a student or team, `<repos_dir>/<prefix><suffix>`.
    pub fn repo_dir(&self, suffix: &str) -> PathBuf {
        self.repos_dir.join(self.repo_name(suffix))
    }

    pub fn repo_name(&self, suffix: &str) -> String {
        format!("{}{}", self.folder_prefix, suffix)
    }

    pub fn remote_url(&self, suffix: &str) -> String {
        format!(
            "https://{}/{}/{}.git",
            self.git_host,
            self.git_context,
            self.repo_name(suffix)
        )
    }
}
