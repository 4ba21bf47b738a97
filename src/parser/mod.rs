use crate::error::CheckerError;
use regex::Regex;
use std::sync::OnceLock;

fn commit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9A-Za-z]{40}").expect("valid commit regex"))
}

/// First 40-character alphanumeric token in the submission text.
///
/// Nothing checks that it is a plausible hash beyond length and charset.
pub fn extract_commit_hash(submission_text: &str) -> Option<&str> {
    commit_pattern().find(submission_text).map(|m| m.as_str())
}

/// Split an upload folder name `<name>(<upload id>)` into its two halves.
pub fn parse_folder_name(folder: &str) -> Result<(&str, &str), CheckerError> {
    let malformed = || CheckerError::MalformedFolderName(folder.to_string());

    let (name, rest) = folder.split_once('(').ok_or_else(malformed)?;
    let upload_id = rest.strip_suffix(')').ok_or_else(malformed)?;

    if upload_id.is_empty() || upload_id.contains(['(', ')']) {
        return Err(malformed());
    }

    Ok((name, upload_id))
}

/// Hidden OS artifacts such as `.DS_Store` never name a submitter.
pub fn is_hidden_entry(name: &str) -> bool {
    name.starts_with('.')
}

/// Flatten submitter arguments: entries may be comma separated, and blank
/// entries are dropped.
pub fn parse_submitter_list<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|entry| entry.as_ref().split([',', '\n']))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
