use crate::config::Config;
use crate::error::{CheckerError, RERUN_ROSTER, RERUN_TEAMS};
use crate::harvester::{self, Submitter};
use crate::models::{
    AssignmentRecord, Aliases, CommitClaim, Roster, StudentTeams, TeamMembers, Verdict,
    STR_MISSING, STR_NOT_APPLICABLE,
};
use crate::parser;
use crate::store::{load_control_file, save_json, RunContext, SyncedRepos};
use crate::timestamp::{self, Deadline};
use crate::vcs::Vcs;
use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};

/// Assignment name is the last component of the submissions folder path.
pub fn assignment_alias(submissions: &Path) -> String {
    submissions
        .components()
        .next_back()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Make sure a local checkout exists, wipe local changes and pull it at most
/// once per run. Failures are logged against `owner` and swallowed so the
/// rest of the roster still gets processed.
pub fn sync_repo<V: Vcs>(
    config: &Config,
    vcs: &V,
    synced: &mut SyncedRepos,
    owner: &str,
    suffix: &str,
) -> bool {
    let dir = config.repo_dir(suffix);

    if !dir.is_dir() {
        if let Err(e) = std::fs::create_dir_all(&config.repos_dir) {
            log::error!("{}: couldn't create {}: {}", owner, config.repos_dir.display(), e);
            return false;
        }

        log::info!("{}: cloning {}", owner, config.remote_url(suffix));
        if let Err(e) = vcs.clone_repo(&config.repos_dir, &config.remote_url(suffix)) {
            log::error!("{}: {}", owner, e);
            return false;
        }

        // a fresh clone is already up to date
        synced.mark(suffix);
    }

    if synced.contains(suffix) {
        log::debug!("{}: {} already pulled this run", owner, suffix);
    }
    let should_pull = config.pull && synced.mark(suffix);

    let result = vcs.discard_changes(&dir).and_then(|()| {
        if should_pull {
            vcs.pull(&dir)
        } else {
            Ok(())
        }
    });

    match result {
        Ok(()) => true,
        Err(e) => {
            log::error!("{}: {}", owner, e);
            false
        }
    }
}

/// Check out the claimed commit and confirm the checkout resolves to it.
pub fn validate_commit<V: Vcs>(vcs: &V, repo: &Path, claim: &str, owner: &str) -> bool {
    let resolved = vcs
        .checkout(repo, claim)
        .and_then(|()| vcs.head_commit(repo));

    match resolved {
        Ok(head) => head == claim,
        Err(e) => {
            log::warn!("{}: commit {} not usable: {}", owner, claim, e);
            false
        }
    }
}

/// Fill the commit timestamp and its verdict. Unverified claims get `N/A`.
pub fn reconcile_commit_timestamp<V: Vcs>(
    record: &mut AssignmentRecord,
    vcs: &V,
    repo: &Path,
    deadline: &Deadline,
    owner: &str,
) {
    let not_applicable = |record: &mut AssignmentRecord| {
        record.commit_timestamp = Some(STR_NOT_APPLICABLE.to_string());
        record.commit_verdict = Some(Verdict::NotApplicable);
    };

    let Some(hash) = record.commit.as_ref().and_then(CommitClaim::hash) else {
        return not_applicable(record);
    };
    if record.commit_valid != Some(true) {
        return not_applicable(record);
    }

    let normalized = vcs
        .commit_date(repo, hash)
        .and_then(|raw| timestamp::normalize_commit_stamp(&raw));

    match normalized {
        Ok(stamp) => {
            record.commit_verdict = Some(deadline.commit_verdict(&stamp));
            record.commit_timestamp = Some(stamp);
        }
        Err(e) => {
            log::error!("{}: couldn't read commit date: {}", owner, e);
            not_applicable(record);
        }
    }
}

/// Normalize the upload stamp in place and give it a verdict.
pub fn reconcile_upload_timestamp(record: &mut AssignmentRecord, deadline: &Deadline, owner: &str) {
    let Some(raw) = record.upload_timestamp.as_deref() else {
        return;
    };
    if raw == STR_MISSING {
        return;
    }

    match timestamp::normalize_upload_stamp(raw) {
        Ok(stamp) => {
            record.upload_verdict = Some(deadline.upload_verdict(&stamp));
            record.upload_timestamp = Some(stamp);
        }
        Err(e) => {
            log::warn!("{}: {}", owner, e);
            record.upload_verdict = Some(Verdict::NotApplicable);
        }
    }
}

/// Outcome of one processing pass.
#[derive(Debug, Default)]
pub struct PassSummary {
    pub assignment: String,
    pub processed: Vec<String>,
    pub skipped: usize,
    /// team -> commit it was left checked out at
    pub team_checkouts: IndexMap<String, Option<String>>,
}

/// One processing pass over an assignment's upload folders.
pub struct Pass<'a, V: Vcs> {
    pub config: &'a Config,
    pub vcs: &'a V,
    pub deadline: &'a Deadline,
    pub team_mode: bool,
}

impl<'a, V: Vcs> Pass<'a, V> {
    pub fn new(config: &'a Config, vcs: &'a V, deadline: &'a Deadline, team_mode: bool) -> Self {
        Self {
            config,
            vcs,
            deadline,
            team_mode,
        }
    }

    /// Student repos are named after the student, team repos after the team.
    fn repo_suffix(&self, ctx: &mut RunContext, gt_id: &str) -> Result<String> {
        if !self.team_mode {
            return Ok(gt_id.to_string());
        }

        let teams: &StudentTeams = ctx.files.get(&self.config.team_records_path(), RERUN_TEAMS)?;
        teams
            .get(gt_id)
            .cloned()
            .ok_or_else(|| CheckerError::UnknownTeam(gt_id.to_string()).into())
    }

    fn list_upload_folders(&self, submissions: &Path) -> Result<Vec<String>> {
        let mut folders = Vec::new();

        for entry in std::fs::read_dir(submissions)
            .with_context(|| format!("Failed to list {}", submissions.display()))?
        {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if parser::is_hidden_entry(&name) || !entry.path().is_dir() {
                continue;
            }
            folders.push(name);
        }

        folders.sort();
        Ok(folders)
    }

    /// Folder names for an explicit submitter list. Team names expand to
    /// their members first.
    fn folders_from_list(
        &self,
        ctx: &mut RunContext,
        roster: &Roster,
        whitelist: &[String],
    ) -> Result<Vec<String>> {
        let students: Vec<String> = if self.team_mode {
            let members: &TeamMembers =
                ctx.files.get(&self.config.team_members_path(), RERUN_TEAMS)?;
            let mut expanded = Vec::new();
            for team in whitelist {
                match members.get(team) {
                    Some(group) => expanded.extend(group.iter().cloned()),
                    None => log::warn!("{}", CheckerError::UnknownTeam(team.clone())),
                }
            }
            expanded
        } else {
            whitelist.to_vec()
        };

        let aliases: &Aliases = ctx.files.get(&self.config.student_aliases_path(), RERUN_ROSTER)?;

        let mut folders = Vec::new();
        for gt_id in &students {
            match aliases
                .get(gt_id)
                .and_then(|upload_id| roster.get(upload_id).map(|s| s.folder_name(upload_id)))
            {
                Some(folder) => folders.push(folder),
                None => log::error!(
                    "Couldn't get folder name: {}",
                    CheckerError::UnknownStudent(gt_id.clone())
                ),
            }
        }

        Ok(folders)
    }

    /// Process every submitter (or just `whitelist`), persist the roster and,
    /// in team mode, leave each team repo at its newest valid commit.
    pub fn run(
        &self,
        ctx: &mut RunContext,
        submissions: &Path,
        whitelist: Option<&[String]>,
    ) -> Result<PassSummary> {
        if !submissions.is_dir() {
            return Err(CheckerError::SubmissionFolderNotFound(submissions.to_path_buf()).into());
        }

        let records_path = self.config.student_records_path();
        let mut roster: Roster = load_control_file(&records_path, RERUN_ROSTER)?;

        if self.team_mode {
            // fail early rather than on the first student
            ctx.files
                .get::<StudentTeams>(&self.config.team_records_path(), RERUN_TEAMS)?;
        }

        std::fs::create_dir_all(&self.config.repos_dir).with_context(|| {
            format!("Failed to create {}", self.config.repos_dir.display())
        })?;

        let folders = match whitelist {
            Some(list) => self.folders_from_list(ctx, &roster, list)?,
            None => self.list_upload_folders(submissions)?,
        };

        let mut summary = PassSummary {
            assignment: assignment_alias(submissions),
            ..PassSummary::default()
        };
        let mut touched_teams = IndexSet::new();

        for folder in &folders {
            let upload_id = match parser::parse_folder_name(folder) {
                Ok((_, upload_id)) => upload_id,
                Err(e) => {
                    log::warn!("{}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let Some(student) = roster.get_mut(upload_id) else {
                log::warn!("{}", CheckerError::UnknownStudent(upload_id.to_string()));
                summary.skipped += 1;
                continue;
            };

            let suffix = match self.repo_suffix(ctx, &student.gt_id) {
                Ok(suffix) => suffix,
                Err(e) => {
                    log::warn!("{}", e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let name = student.name.clone();
            let gt_id = student.gt_id.clone();
            let record = student.reset_assignment(&summary.assignment);

            self.process_student(
                ctx,
                record,
                &submissions.join(folder),
                Submitter {
                    name: &name,
                    gt_id: &gt_id,
                    upload_id,
                },
                &suffix,
            );

            if self.team_mode {
                touched_teams.insert(suffix);
            }
            summary.processed.push(gt_id);
        }

        save_json(&records_path, &roster)?;
        ctx.files.invalidate(&records_path);
        log::info!(
            "{}: processed {}, skipped {}",
            summary.assignment,
            summary.processed.len(),
            summary.skipped
        );
        log::debug!("{} control files cached", ctx.files.len());

        if self.team_mode {
            let teams: Vec<String> = match whitelist {
                Some(list) => list.to_vec(),
                None => touched_teams.into_iter().collect(),
            };
            summary.team_checkouts =
                self.checkout_latest_team_commits(ctx, &roster, &summary.assignment, &teams)?;
        }

        Ok(summary)
    }

    fn process_student(
        &self,
        ctx: &mut RunContext,
        record: &mut AssignmentRecord,
        folder: &Path,
        student: Submitter<'_>,
        suffix: &str,
    ) {
        harvester::harvest(record, folder, student, &self.config.timestamp_filename);

        if !sync_repo(self.config, self.vcs, &mut ctx.synced, student.gt_id, suffix) {
            log::debug!("{}: checking {} against a stale or missing checkout", student.gt_id, suffix);
        }

        let repo: PathBuf = self.config.repo_dir(suffix);
        match record.commit.as_ref().and_then(CommitClaim::hash) {
            Some(hash) => {
                record.commit_valid = Some(validate_commit(self.vcs, &repo, hash, student.gt_id));
                reconcile_commit_timestamp(record, self.vcs, &repo, self.deadline, student.gt_id);
            }
            None => log::debug!(
                "{}: nothing to validate ({})",
                student.gt_id,
                record.commit_claim()
            ),
        }

        reconcile_upload_timestamp(record, self.deadline, student.gt_id);
    }

    /// Newest valid member commit per team, by normalized commit timestamp.
    pub fn latest_team_commit(
        &self,
        ctx: &mut RunContext,
        roster: &Roster,
        assignment: &str,
        team: &str,
    ) -> Result<Option<String>> {
        let members: &TeamMembers = ctx.files.get(&self.config.team_members_path(), RERUN_TEAMS)?;
        let Some(members) = members.get(team).cloned() else {
            log::warn!("{}", CheckerError::UnknownTeam(team.to_string()));
            return Ok(None);
        };

        let aliases: &Aliases = ctx.files.get(&self.config.student_aliases_path(), RERUN_ROSTER)?;

        let latest = members
            .iter()
            .filter_map(|gt_id| aliases.get(gt_id))
            .filter_map(|upload_id| roster.get(upload_id))
            .filter_map(|student| student.assignment(assignment))
            .filter_map(|record| {
                let hash = record.commit.as_ref()?.hash()?;
                let stamp = record.commit_timestamp.as_deref()?;
                (stamp != STR_NOT_APPLICABLE).then_some((stamp, hash))
            })
            .max()
            .map(|(_, hash)| hash.to_string());

        Ok(latest)
    }

    fn checkout_latest_team_commits(
        &self,
        ctx: &mut RunContext,
        roster: &Roster,
        assignment: &str,
        teams: &[String],
    ) -> Result<IndexMap<String, Option<String>>> {
        let mut checkouts = IndexMap::new();

        for team in teams {
            let latest = self.latest_team_commit(ctx, roster, assignment, team)?;

            match &latest {
                Some(hash) => {
                    let repo = self.config.repo_dir(team);
                    match self.vcs.checkout(&repo, hash) {
                        Ok(()) => log::info!("{}: checked out {}", team, hash),
                        Err(e) => log::error!("{}: {}", team, e),
                    }
                }
                None => log::warn!("NO VALID COMMITS FOR {}!", team),
            }

            checkouts.insert(team.clone(), latest);
        }

        Ok(checkouts)
    }
}
