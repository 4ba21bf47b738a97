mod config;
mod error;
mod export;
mod fetcher;
mod harvester;
mod models;
mod parser;
mod report;
mod roster;
mod store;
mod timestamp;
mod vcs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use std::path::{Path, PathBuf};
use store::RunContext;
use timestamp::Deadline;

#[derive(Parser)]
#[command(name = "submission-checker")]
#[command(author, version, about = "Collect student commit submissions and check them against a deadline", long_about = None)]
struct Cli {
    /// YAML course file overriding the built-in defaults
    #[arg(long, global = true, env = "SUBMISSIONS_CONFIG")]
    config: Option<PathBuf>,

    /// Show git invocations and other debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the roster and alias files from a tab-delimited class roster
    Roster {
        #[arg(long)]
        input: PathBuf,
    },
    /// Build the team files from a tab-delimited team sheet
    Teams {
        #[arg(long)]
        input: PathBuf,
    },
    /// Harvest submissions, sync repositories and check deadlines
    Prep {
        /// Assignment upload folder; its last path component names the assignment
        #[arg(long)]
        submissions: PathBuf,
        /// Deadline as `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        deadline: String,
        /// Only these students (or teams with --team)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        /// Newline-delimited file of students (or teams)
        #[arg(long)]
        list: Option<PathBuf>,
        #[arg(long)]
        team: bool,
        /// Don't pull repositories that already exist locally
        #[arg(long)]
        no_pull: bool,
    },
    /// Print late, missing and bad-commit submitters for an assignment
    Report {
        #[arg(long)]
        assignment: String,
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        #[arg(long)]
        list: Option<PathBuf>,
        #[arg(long)]
        team: bool,
        /// Also write the report to this file (empty or bare for the default name)
        #[arg(long, num_args = 0..=1, default_missing_value = report::DEFAULT_REPORT_FILENAME)]
        out: Option<String>,
        /// Append to the report file instead of overwriting it
        #[arg(long, requires = "out")]
        append: bool,
        /// Export the reported submitters as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn submitter_list(only: &[String], list: Option<&Path>) -> Result<Vec<String>> {
    let mut entries = parser::parse_submitter_list(only);

    if let Some(path) = list {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read submitter list {}", path.display()))?;
        entries.extend(parser::parse_submitter_list(&[text]));
    }

    Ok(entries)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Roster { input } => {
            let count = roster::create_student_json(&config, &input)?;
            println!("Loaded {} students from {}.", count, input.display());
        }
        Commands::Teams { input } => {
            let count = roster::create_team_json(&config, &input)?;
            println!("Loaded {} teams from {}.", count, input.display());
        }
        Commands::Prep {
            submissions,
            deadline,
            only,
            list,
            team,
            no_pull,
        } => {
            let deadline = Deadline::parse(&deadline)?;
            if no_pull {
                config.pull = false;
            }

            let whitelist = submitter_list(&only, list.as_deref())?;
            let whitelist = (!whitelist.is_empty()).then_some(whitelist);

            let git = vcs::GitCli::default();
            let mut ctx = RunContext::new();
            let summary = fetcher::Pass::new(&config, &git, &deadline, team)
                .run(&mut ctx, &submissions, whitelist.as_deref())?;

            println!(
                "{}: processed {} submitters against {} ({} skipped).",
                summary.assignment,
                summary.processed.len(),
                deadline,
                summary.skipped
            );
            for (team, commit) in &summary.team_checkouts {
                match commit {
                    Some(hash) => println!("{}: {}", team, hash),
                    None => println!("{}: no valid commits", team),
                }
            }
        }
        Commands::Report {
            assignment,
            only,
            list,
            team,
            out,
            append,
            csv,
        } => {
            let submitters = submitter_list(&only, list.as_deref())?;

            let file = out
                .as_deref()
                .map(|name| report::open_report_file(Path::new(name), append))
                .transpose()?;
            let (report_path, file) = match file {
                Some((path, file)) => (Some(path), Some(file)),
                None => (None, None),
            };

            let mut sink = report::Tee::new(std::io::stdout().lock(), file);
            let mut ctx = RunContext::new();
            let report =
                report::generate_report(&config, &mut ctx, &assignment, &submitters, team, &mut sink)?;

            log::debug!(
                "{} late uploads, {} late commits, {} missing, {} bad commits",
                report.summary.late_upload.len(),
                report.summary.late_commit.len(),
                report.summary.missing.len(),
                report.summary.bad_commit.len()
            );
            if let Some(path) = report_path {
                log::info!("Report written to {}", path.display());
            }
            if let Some(path) = csv {
                export::export_to_csv(&report.rows, &path)?;
                log::info!("CSV written to {}", path.display());
            }
        }
    }

    Ok(())
}
