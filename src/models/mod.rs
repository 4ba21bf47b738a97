use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Sentinels and Verdicts
// ============================================================================

pub const STR_INVALID: &str = "Invalid";
pub const STR_MISSING: &str = "Missing";
pub const STR_NOT_APPLICABLE: &str = "N/A";

/// True unless the claim is one of the two sentinels.
pub fn is_commit_present(commit: &str) -> bool {
    commit != STR_INVALID && commit != STR_MISSING
}

/// The commit a submitter declared, before it is checked against the repo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommitClaim {
    Hash(String),
    /// The submission text had no 40-character token
    Invalid,
    /// No submission text, or no timestamp sidecar
    Missing,
}

impl CommitClaim {
    pub fn hash(&self) -> Option<&str> {
        match self {
            CommitClaim::Hash(hash) => Some(hash),
            _ => None,
        }
    }
}

impl From<String> for CommitClaim {
    fn from(value: String) -> Self {
        if is_commit_present(&value) {
            CommitClaim::Hash(value)
        } else if value == STR_INVALID {
            CommitClaim::Invalid
        } else {
            CommitClaim::Missing
        }
    }
}

impl From<CommitClaim> for String {
    fn from(value: CommitClaim) -> Self {
        value.to_string()
    }
}

impl fmt::Display for CommitClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitClaim::Hash(hash) => f.write_str(hash),
            CommitClaim::Invalid => f.write_str(STR_INVALID),
            CommitClaim::Missing => f.write_str(STR_MISSING),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Ok,
    Late,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Ok => "Ok",
            Verdict::Late => "Late",
            Verdict::NotApplicable => STR_NOT_APPLICABLE,
        };
        f.write_str(label)
    }
}

// ============================================================================
// Persisted Roster Models
// ============================================================================

/// Per-assignment results for one student, rebuilt on every pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    #[serde(rename = "commitID", skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitClaim>,
    #[serde(rename = "commitID valid", skip_serializing_if = "Option::is_none")]
    pub commit_valid: Option<bool>,
    #[serde(rename = "Timestamp T-Square", skip_serializing_if = "Option::is_none")]
    pub upload_timestamp: Option<String>,
    #[serde(rename = "Timestamp GitHub", skip_serializing_if = "Option::is_none")]
    pub commit_timestamp: Option<String>,
    #[serde(rename = "Submission T-Square", skip_serializing_if = "Option::is_none")]
    pub upload_verdict: Option<Verdict>,
    #[serde(rename = "Submission GitHub", skip_serializing_if = "Option::is_none")]
    pub commit_verdict: Option<Verdict>,
}

impl AssignmentRecord {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn commit_claim(&self) -> &CommitClaim {
        self.commit.as_ref().unwrap_or(&CommitClaim::Missing)
    }

    /// Recorded fields as `(key, value)` pairs in reverse-lexicographic key
    /// order, the order the report prints them in.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(commit) = &self.commit {
            fields.push(("commitID", commit.to_string()));
        }
        if let Some(valid) = self.commit_valid {
            fields.push(("commitID valid", valid.to_string()));
        }
        if let Some(stamp) = &self.upload_timestamp {
            fields.push(("Timestamp T-Square", stamp.clone()));
        }
        if let Some(stamp) = &self.commit_timestamp {
            fields.push(("Timestamp GitHub", stamp.clone()));
        }
        if let Some(verdict) = self.upload_verdict {
            fields.push(("Submission T-Square", verdict.to_string()));
        }
        if let Some(verdict) = self.commit_verdict {
            fields.push(("Submission GitHub", verdict.to_string()));
        }
        fields.sort_by(|a, b| b.0.cmp(&a.0));
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub gt_id: String,
    #[serde(flatten)]
    pub assignments: IndexMap<String, AssignmentRecord>,
}

impl StudentRecord {
    pub fn new(name: impl Into<String>, gt_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            gt_id: gt_id.into(),
            assignments: IndexMap::new(),
        }
    }

    /// Fresh record for `assignment`, discarding whatever the last pass left.
    pub fn reset_assignment(&mut self, assignment: &str) -> &mut AssignmentRecord {
        let record = self.assignments.entry(assignment.to_string()).or_default();
        record.reset();
        record
    }

    pub fn assignment(&self, assignment: &str) -> Option<&AssignmentRecord> {
        self.assignments.get(assignment)
    }

    /// Upload folder name, `<name>(<upload id>)`.
    pub fn folder_name(&self, upload_id: &str) -> String {
        format!("{}({})", self.name, upload_id)
    }
}

/// upload id -> student
pub type Roster = IndexMap<String, StudentRecord>;
/// stable id -> upload id
pub type Aliases = IndexMap<String, String>;
/// stable id -> team name
pub type StudentTeams = IndexMap<String, String>;
/// team name -> ordered member stable ids
pub type TeamMembers = IndexMap<String, Vec<String>>;

// ============================================================================
// Report Models
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportSummary {
    pub late_upload: Vec<String>,
    pub late_commit: Vec<String>,
    pub missing: Vec<String>,
    pub bad_commit: Vec<String>,
}

/// One reported submitter, flattened for CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub submitter: String,
    pub team: Option<String>,
    pub record: Option<AssignmentRecord>,
}
