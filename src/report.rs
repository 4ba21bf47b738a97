use crate::config::Config;
use crate::error::{RERUN_ROSTER, RERUN_TEAMS};
use crate::models::{
    Aliases, AssignmentRecord, CommitClaim, ReportRow, ReportSummary, Roster, TeamMembers,
    Verdict,
};
use crate::store::{load_control_file, RunContext};
use anyhow::{Context, Result};
use indexmap::IndexSet;
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_REPORT_FILENAME: &str = "submission_runner.txt";

/// Writes every byte to both sinks, so the console and the report file
/// always hold the same text.
pub struct Tee<A: Write, B: Write> {
    first: A,
    second: Option<B>,
}

impl<A: Write, B: Write> Tee<A, B> {
    pub fn new(first: A, second: Option<B>) -> Self {
        Self { first, second }
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (A, Option<B>) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        if let Some(second) = self.second.as_mut() {
            second.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        if let Some(second) = self.second.as_mut() {
            second.flush()?;
        }
        Ok(())
    }
}

/// An empty name falls back to the default report file.
pub fn report_path(name: &Path) -> PathBuf {
    if name.as_os_str().is_empty() {
        PathBuf::from(DEFAULT_REPORT_FILENAME)
    } else {
        name.to_path_buf()
    }
}

/// Open the report file, overwriting it unless `append` is set.
pub fn open_report_file(name: &Path, append: bool) -> Result<(PathBuf, File)> {
    let path = report_path(name);

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(&path)
        .with_context(|| format!("Failed to open report file {}", path.display()))?;

    Ok((path, file))
}

enum Entry {
    TeamHeader(String),
    Student { gt_id: String, team: Option<String> },
}

#[derive(Debug)]
pub struct Report {
    pub summary: ReportSummary,
    pub rows: Vec<ReportRow>,
}

fn select_entries(
    config: &Config,
    ctx: &mut RunContext,
    aliases: &Aliases,
    submitters: &[String],
    team_mode: bool,
) -> Result<Vec<Entry>> {
    let submitters: Vec<String> = submitters
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut entries = Vec::new();
    let mut seen = IndexSet::new();

    if team_mode {
        let members: &TeamMembers = ctx.files.get(&config.team_members_path(), RERUN_TEAMS)?;
        let teams: Vec<String> = if submitters.is_empty() {
            members.keys().cloned().collect()
        } else {
            submitters.to_vec()
        };

        for team in teams {
            let Some(group) = members.get(&team) else {
                log::warn!("Couldn't find team '{}'", team);
                continue;
            };
            entries.push(Entry::TeamHeader(team.clone()));
            for gt_id in group {
                if seen.insert(gt_id.clone()) {
                    entries.push(Entry::Student {
                        gt_id: gt_id.clone(),
                        team: Some(team.clone()),
                    });
                }
            }
        }
    } else {
        let students: Vec<String> = if submitters.is_empty() {
            aliases.keys().cloned().collect()
        } else {
            submitters.to_vec()
        };

        for gt_id in students {
            if seen.insert(gt_id.clone()) {
                entries.push(Entry::Student { gt_id, team: None });
            }
        }
    }

    Ok(entries)
}

fn classify(summary: &mut ReportSummary, gt_id: &str, record: &AssignmentRecord) {
    if record.upload_verdict == Some(Verdict::Late) {
        summary.late_upload.push(gt_id.to_string());
    }
    if record.commit_verdict == Some(Verdict::Late) {
        summary.late_commit.push(gt_id.to_string());
    }
    if record.commit == Some(CommitClaim::Missing) {
        summary.missing.push(gt_id.to_string());
    }
    if record.commit_valid == Some(false) {
        summary.bad_commit.push(gt_id.to_string());
    }
}

pub fn render_summary(summary: &ReportSummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "\n========== RESULTS ==========");
    let _ = writeln!(output, "\nLATE SUBMISSIONS:");
    let _ = writeln!(
        output,
        "\tT-Square ({}): {}",
        summary.late_upload.len(),
        summary.late_upload.join(", ")
    );
    let _ = writeln!(
        output,
        "\tGitHub ({}): {}",
        summary.late_commit.len(),
        summary.late_commit.join(", ")
    );
    let _ = writeln!(
        output,
        "\nMISSING SUBMISSIONS ({}): {}",
        summary.missing.len(),
        summary.missing.join(", ")
    );
    let _ = writeln!(
        output,
        "\nBAD COMMITS ({}):\n\t{}",
        summary.bad_commit.len(),
        summary.bad_commit.join(", ")
    );

    output
}

/// Print each selected submitter's records for `assignment` and a summary of
/// late, missing and bad-commit submitters.
///
/// With an empty `submitters` list every student (or every team) is reported.
pub fn generate_report<W: Write>(
    config: &Config,
    ctx: &mut RunContext,
    assignment: &str,
    submitters: &[String],
    team_mode: bool,
    out: &mut W,
) -> Result<Report> {
    let aliases: Aliases = load_control_file(&config.student_aliases_path(), RERUN_ROSTER)?;
    let roster: Roster = load_control_file(&config.student_records_path(), RERUN_ROSTER)?;

    let entries = select_entries(config, ctx, &aliases, submitters, team_mode)?;

    let mut summary = ReportSummary::default();
    let mut rows = Vec::new();

    writeln!(out, "Report: {}\n", assignment)?;

    for entry in entries {
        let (gt_id, team) = match entry {
            Entry::TeamHeader(team) => {
                writeln!(out, "\n========== {} ==========", team)?;
                continue;
            }
            Entry::Student { gt_id, team } => (gt_id, team),
        };

        writeln!(out, "{}", gt_id)?;

        let record = aliases
            .get(&gt_id)
            .and_then(|upload_id| roster.get(upload_id))
            .and_then(|student| student.assignment(assignment));

        match record {
            Some(record) => {
                for (key, value) in record.fields() {
                    writeln!(out, "\t{}: {}", key, value)?;
                }
                classify(&mut summary, &gt_id, record);
            }
            None => {
                writeln!(out, "\tNo records found")?;
                summary.missing.push(gt_id.clone());
            }
        }

        rows.push(ReportRow {
            submitter: gt_id,
            team,
            record: record.cloned(),
        });
    }

    write!(out, "{}", render_summary(&summary))?;
    out.flush()?;

    Ok(Report { summary, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StudentRecord;
    use crate::store::save_json;

    fn hash(c: char) -> String {
        c.to_string().repeat(40)
    }

    fn setup(dir: &Path) -> Config {
        let config = Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        };

        let mut roster = Roster::new();
        let mut aliases = Aliases::new();

        let mut ada = StudentRecord::new("Lovelace, Ada", "alovelace3");
        *ada.reset_assignment("A1") = AssignmentRecord {
            commit: Some(CommitClaim::Hash(hash('a'))),
            commit_valid: Some(true),
            upload_timestamp: Some("2017-10-06T05:00:00".to_string()),
            commit_timestamp: Some("2017-10-06 03:00:00".to_string()),
            upload_verdict: Some(Verdict::Late),
            commit_verdict: Some(Verdict::Ok),
        };

        let mut alan = StudentRecord::new("Turing, Alan", "aturing7");
        *alan.reset_assignment("A1") = AssignmentRecord {
            commit: Some(CommitClaim::Hash(hash('b'))),
            commit_valid: Some(false),
            upload_timestamp: Some("2017-10-06T03:00:00".to_string()),
            commit_timestamp: Some("N/A".to_string()),
            upload_verdict: Some(Verdict::Ok),
            commit_verdict: Some(Verdict::NotApplicable),
        };

        let mut grace = StudentRecord::new("Hopper, Grace", "ghopper9");
        *grace.reset_assignment("A1") = AssignmentRecord {
            commit: Some(CommitClaim::Missing),
            upload_timestamp: Some("Missing".to_string()),
            ..AssignmentRecord::default()
        };

        // never processed for A1
        let charles = StudentRecord::new("Babbage, Charles", "cbabbage1");

        for (upload_id, student) in [("9001", ada), ("9002", alan), ("9003", grace), ("9004", charles)] {
            aliases.insert(student.gt_id.clone(), upload_id.to_string());
            roster.insert(upload_id.to_string(), student);
        }

        save_json(&config.student_records_path(), &roster).unwrap();
        save_json(&config.student_aliases_path(), &aliases).unwrap();

        let mut members = TeamMembers::new();
        members.insert(
            "Team01".to_string(),
            vec!["alovelace3".to_string(), "aturing7".to_string()],
        );
        members.insert(
            "Team02".to_string(),
            vec!["ghopper9".to_string(), "cbabbage1".to_string()],
        );
        save_json(&config.team_members_path(), &members).unwrap();

        config
    }

    fn run(config: &Config, submitters: &[&str], team_mode: bool) -> (Report, String) {
        let submitters: Vec<String> = submitters.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        let mut ctx = RunContext::new();
        let report =
            generate_report(config, &mut ctx, "A1", &submitters, team_mode, &mut out).unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_report_classifies_everyone() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let (report, text) = run(&config, &[], false);

        assert_eq!(report.summary.late_upload, vec!["alovelace3"]);
        assert!(report.summary.late_commit.is_empty());
        assert_eq!(report.summary.missing, vec!["ghopper9", "cbabbage1"]);
        assert_eq!(report.summary.bad_commit, vec!["aturing7"]);
        assert_eq!(report.rows.len(), 4);

        assert!(text.starts_with("Report: A1\n\n"));
        assert!(text.contains("\tT-Square (1): alovelace3\n"));
        assert!(text.contains("\tGitHub (0): \n"));
        assert!(text.contains("MISSING SUBMISSIONS (2): ghopper9, cbabbage1\n"));
        assert!(text.contains("BAD COMMITS (1):\n\taturing7\n"));
    }

    #[test]
    fn test_report_prints_fields_in_reverse_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let (_, text) = run(&config, &["alovelace3"], false);

        let valid = text.find("\tcommitID valid: true").unwrap();
        let commit = text.find("\tcommitID: ").unwrap();
        let github = text.find("\tSubmission GitHub: Ok").unwrap();
        assert!(valid < commit);
        assert!(commit < github);
    }

    #[test]
    fn test_unprocessed_student_is_missing_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let (report, text) = run(&config, &["cbabbage1", " ", "cbabbage1"], false);

        assert_eq!(report.summary.missing, vec!["cbabbage1"]);
        assert_eq!(text.matches("No records found").count(), 1);
        assert_eq!(text.matches("cbabbage1").count(), 2);
    }

    #[test]
    fn test_team_report_groups_members() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());

        let (report, text) = run(&config, &["Team02"], true);

        assert!(text.contains("\n========== Team02 ==========\n"));
        assert!(!text.contains("Team01"));
        assert_eq!(report.summary.missing, vec!["ghopper9", "cbabbage1"]);
        assert!(report.rows.iter().all(|row| row.team.as_deref() == Some("Team02")));
    }

    #[test]
    fn test_report_without_aliases_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let mut ctx = RunContext::new();
        let mut out = Vec::new();

        let err = generate_report(&config, &mut ctx, "A1", &[], false, &mut out).unwrap_err();
        assert!(err.to_string().contains("student_aliases.json"));
    }

    #[test]
    fn test_tee_writes_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path());
        let report_path = dir.path().join("report.txt");
        let (_, file) = open_report_file(&report_path, false).unwrap();

        let mut tee = Tee::new(Vec::new(), Some(file));
        let mut ctx = RunContext::new();
        generate_report(&config, &mut ctx, "A1", &[], false, &mut tee).unwrap();

        let (console, _) = tee.into_parts();
        let on_disk = std::fs::read(&report_path).unwrap();
        assert_eq!(console, on_disk);
    }

    #[test]
    fn test_report_path_defaults_when_empty() {
        assert_eq!(report_path(Path::new("")), PathBuf::from("submission_runner.txt"));
        assert_eq!(report_path(Path::new("a1.txt")), PathBuf::from("a1.txt"));
    }

    #[test]
    fn test_report_file_append_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "old\n").unwrap();

        let (_, mut file) = open_report_file(&path, true).unwrap();
        file.write_all(b"new\n").unwrap();
        drop(file);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old\nnew\n");

        let (_, mut file) = open_report_file(&path, false).unwrap();
        file.write_all(b"fresh\n").unwrap();
        drop(file);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}
