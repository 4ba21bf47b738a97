use crate::models::{CommitClaim, ReportRow};
use anyhow::{Context, Result};
use std::path::Path;

/// Export the reported submitters to a CSV file, one row each.
pub fn export_to_csv(rows: &[ReportRow], filepath: &Path) -> Result<()> {
    if rows.is_empty() {
        anyhow::bail!("No submitters to export");
    }

    let mut wtr = csv::Writer::from_path(filepath).context("Failed to create CSV file")?;

    wtr.write_record([
        "submitter",
        "team",
        "commit",
        "commit_valid",
        "upload_timestamp",
        "upload_verdict",
        "commit_timestamp",
        "commit_verdict",
        "missing",
    ])
    .context("Failed to write CSV headers")?;

    for row in rows {
        let record = row.record.as_ref();
        let text = |value: Option<String>| value.unwrap_or_default();

        let missing = record.map_or(true, |r| r.commit == Some(CommitClaim::Missing));

        wtr.write_record([
            row.submitter.clone(),
            row.team.clone().unwrap_or_default(),
            text(record.and_then(|r| r.commit.as_ref()).map(|c| c.to_string())),
            text(record.and_then(|r| r.commit_valid).map(|v| v.to_string())),
            text(record.and_then(|r| r.upload_timestamp.clone())),
            text(record.and_then(|r| r.upload_verdict).map(|v| v.to_string())),
            text(record.and_then(|r| r.commit_timestamp.clone())),
            text(record.and_then(|r| r.commit_verdict).map(|v| v.to_string())),
            missing.to_string(),
        ])
        .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssignmentRecord, Verdict};

    #[test]
    fn test_export_csv() {
        let dir = tempfile::tempdir().unwrap();
        let filepath = dir.path().join("A1.csv");

        let rows = vec![
            ReportRow {
                submitter: "alovelace3".to_string(),
                team: Some("Team01".to_string()),
                record: Some(AssignmentRecord {
                    commit: Some(CommitClaim::Hash("a".repeat(40))),
                    commit_valid: Some(true),
                    upload_timestamp: Some("2017-10-06T03:11:50".to_string()),
                    commit_timestamp: Some("2017-10-06 03:00:00".to_string()),
                    upload_verdict: Some(Verdict::Ok),
                    commit_verdict: Some(Verdict::Late),
                }),
            },
            ReportRow {
                submitter: "cbabbage1".to_string(),
                team: None,
                record: None,
            },
        ];

        export_to_csv(&rows, &filepath).unwrap();

        let mut reader = csv::Reader::from_path(&filepath).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "alovelace3");
        assert_eq!(&records[0][3], "true");
        assert_eq!(&records[0][7], "Late");
        assert_eq!(&records[0][8], "false");
        assert_eq!(&records[1][2], "");
        assert_eq!(&records[1][8], "true");
    }

    #[test]
    fn test_export_nothing_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export_to_csv(&[], &dir.path().join("empty.csv")).is_err());
    }
}
