use crate::config::Config;
use crate::error::CheckerError;
use crate::models::{Aliases, Roster, StudentRecord, StudentTeams, TeamMembers};
use crate::store::save_json;
use anyhow::{Context, Result};
use std::path::Path;

/// Team assigned to a roster line with no team column.
const NO_TEAM: &str = "None";

fn tab_reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    let file = std::fs::File::open(path).map_err(|source| CheckerError::MissingInput {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .quoting(false)
        .from_reader(file))
}

/// Parse a class roster of `name \t gt_id \t upload_id` lines.
pub fn parse_roster(path: &Path) -> Result<(Roster, Aliases)> {
    let mut reader = tab_reader(path)?;
    let mut students = Roster::new();
    let mut aliases = Aliases::new();

    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to read line {} of {}", line + 1, path.display()))?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        let (Some(name), Some(gt_id), Some(upload_id)) = (record.get(0), record.get(1), record.get(2))
        else {
            anyhow::bail!(
                "Line {} of {} needs name, GT id and upload id columns",
                line + 1,
                path.display()
            );
        };

        students.insert(upload_id.to_string(), StudentRecord::new(name, gt_id));
        aliases.insert(gt_id.to_string(), upload_id.to_string());
    }

    Ok((students, aliases))
}

/// Parse a team sheet of `gt_id \t ... \t team` lines.
pub fn parse_teams(path: &Path) -> Result<(StudentTeams, TeamMembers)> {
    let mut reader = tab_reader(path)?;
    let mut student_teams = StudentTeams::new();
    let mut team_members = TeamMembers::new();

    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Failed to read line {} of {}", line + 1, path.display()))?;

        let Some(student) = record.get(0).filter(|s| !s.is_empty()) else {
            continue;
        };
        let team = record.get(2).filter(|t| !t.is_empty()).unwrap_or(NO_TEAM);

        student_teams.insert(student.to_string(), team.to_string());
        team_members
            .entry(team.to_string())
            .or_default()
            .push(student.to_string());
    }

    Ok((student_teams, team_members))
}

/// Roster ingestion: writes the roster and alias files.
pub fn create_student_json(config: &Config, input: &Path) -> Result<usize> {
    let (students, aliases) = parse_roster(input)?;

    save_json(&config.student_records_path(), &students)?;
    save_json(&config.student_aliases_path(), &aliases)?;

    log::info!(
        "Wrote {} students to {}",
        students.len(),
        config.student_records_path().display()
    );
    Ok(students.len())
}

/// Team ingestion: writes the student-to-team and team-to-members files.
pub fn create_team_json(config: &Config, input: &Path) -> Result<usize> {
    let (student_teams, team_members) = parse_teams(input)?;

    save_json(&config.team_records_path(), &student_teams)?;
    save_json(&config.team_members_path(), &team_members)?;

    log::info!(
        "Wrote {} teams to {}",
        team_members.len(),
        config.team_members_path().display()
    );
    Ok(team_members.len())
}
