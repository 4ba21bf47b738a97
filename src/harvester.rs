use crate::models::{AssignmentRecord, CommitClaim, STR_MISSING};
use crate::parser;
use std::path::Path;

/// Who an upload folder belongs to.
#[derive(Debug, Clone, Copy)]
pub struct Submitter<'a> {
    pub name: &'a str,
    pub gt_id: &'a str,
    pub upload_id: &'a str,
}

impl Submitter<'_> {
    /// `<name>(<upload id>)`
    pub fn folder_name(&self) -> String {
        format!("{}({})", self.name, self.upload_id)
    }

    pub fn submission_text_filename(&self) -> String {
        format!("{}_submissionText.html", self.folder_name())
    }
}

/// Pull the claimed commit out of the submission text.
pub fn read_commit_claim(folder: &Path, student: Submitter<'_>) -> CommitClaim {
    let path = folder.join(student.submission_text_filename());

    // Uploads are not always valid UTF-8
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("{}: no submission text at {} ({})", student.gt_id, path.display(), e);
            return CommitClaim::Missing;
        }
    };

    match parser::extract_commit_hash(&String::from_utf8_lossy(&bytes)) {
        Some(hash) => CommitClaim::Hash(hash.to_string()),
        None => {
            log::warn!("{}: no commit hash in {}", student.gt_id, path.display());
            CommitClaim::Invalid
        }
    }
}

/// Raw upload timestamp from the sidecar, read verbatim.
pub fn read_upload_timestamp(folder: &Path, timestamp_filename: &str) -> Option<String> {
    std::fs::read_to_string(folder.join(timestamp_filename)).ok()
}

/// Fill the commit claim and raw upload timestamp for one student.
///
/// A missing timestamp sidecar counts as no submission at all, so it also
/// forces the commit to `Missing`.
pub fn harvest(
    record: &mut AssignmentRecord,
    folder: &Path,
    student: Submitter<'_>,
    timestamp_filename: &str,
) {
    record.commit = Some(read_commit_claim(folder, student));

    match read_upload_timestamp(folder, timestamp_filename) {
        Some(stamp) => record.upload_timestamp = Some(stamp),
        None => {
            log::warn!("{}: no {} in {}", student.gt_id, timestamp_filename, folder.display());
            record.upload_timestamp = Some(STR_MISSING.to_string());
            record.commit = Some(CommitClaim::Missing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HASH: &str = "4f2a9c1e0b7d3a5f6e8c9b0a1d2e3f4a5b6c7d8e";

    fn ada() -> Submitter<'static> {
        Submitter {
            name: "Lovelace, Ada",
            gt_id: "alovelace3",
            upload_id: "9001",
        }
    }

    #[test]
    fn test_harvest_complete_submission() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Lovelace, Ada(9001)_submissionText.html"),
            format!("<p>{}</p>", HASH),
        )
        .unwrap();
        fs::write(dir.path().join("timestamp.txt"), "20171006031150569").unwrap();

        let mut record = AssignmentRecord::default();
        harvest(&mut record, dir.path(), ada(), "timestamp.txt");

        assert_eq!(record.commit, Some(CommitClaim::Hash(HASH.to_string())));
        assert_eq!(record.upload_timestamp.as_deref(), Some("20171006031150569"));
    }

    #[test]
    fn test_harvest_without_hash_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Lovelace, Ada(9001)_submissionText.html"),
            "<p>see my repo</p>",
        )
        .unwrap();
        fs::write(dir.path().join("timestamp.txt"), "20171006031150569").unwrap();

        let mut record = AssignmentRecord::default();
        harvest(&mut record, dir.path(), ada(), "timestamp.txt");

        assert_eq!(record.commit, Some(CommitClaim::Invalid));
    }

    #[test]
    fn test_harvest_without_text_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("timestamp.txt"), "20171006031150569").unwrap();

        let mut record = AssignmentRecord::default();
        harvest(&mut record, dir.path(), ada(), "timestamp.txt");

        assert_eq!(record.commit, Some(CommitClaim::Missing));
        assert_eq!(record.upload_timestamp.as_deref(), Some("20171006031150569"));
    }

    #[test]
    fn test_missing_timestamp_overrides_commit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Lovelace, Ada(9001)_submissionText.html"),
            format!("<p>{}</p>", HASH),
        )
        .unwrap();

        let mut record = AssignmentRecord::default();
        harvest(&mut record, dir.path(), ada(), "timestamp.txt");

        assert_eq!(record.commit, Some(CommitClaim::Missing));
        assert_eq!(record.upload_timestamp.as_deref(), Some("Missing"));
    }
}
