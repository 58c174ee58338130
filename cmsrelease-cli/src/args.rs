//! Command-line surface.

use clap::Parser;

use cmsrelease_core::{Addressing, ConfigurationError, OperationKind};

#[derive(Parser, Debug)]
#[command(
    name = "cms-release",
    version,
    about = "Duplicate, synchronise, link and delete content environments",
    long_about = None,
)]
pub struct Cli {
    // -- actions ------------------------------------------------------------
    /// Clone the source environment into a new release environment.
    #[arg(long, help_heading = "Actions")]
    pub duplicate: bool,

    /// Copy entries missing from the destination.
    #[arg(long, help_heading = "Actions")]
    pub sync_entries: bool,

    /// Replay pending scheduled actions missing from the destination.
    #[arg(long, help_heading = "Actions")]
    pub sync_schedule: bool,

    /// Point the alias at the environment.
    #[arg(long, help_heading = "Actions")]
    pub link: bool,

    /// Delete the environment.
    #[arg(long, help_heading = "Actions")]
    pub delete: bool,

    // -- addressing ---------------------------------------------------------
    #[arg(long, help_heading = "Environments")]
    pub from: Option<String>,

    #[arg(long, help_heading = "Environments")]
    pub to: Option<String>,

    /// Single-environment addressing; cannot be combined with --from/--to.
    #[arg(long, help_heading = "Environments")]
    pub environment_id: Option<String>,

    /// Alias to re-point with --link [default: the main environment].
    #[arg(long, help_heading = "Environments")]
    pub alias: Option<String>,

    #[arg(long, env = "CMS_RELEASE_ENVIRONMENT_MAIN", help_heading = "Environments")]
    pub main_environment: Option<String>,

    // -- options ------------------------------------------------------------
    /// Allow writing into or deleting a protected environment.
    #[arg(long, short = 'y')]
    pub force_yes: bool,

    /// Give the delivery key named after the source access to the clone.
    #[arg(long)]
    pub update_api_key: bool,

    /// With --link, delete older release environments.
    #[arg(long)]
    pub prune_old_releases: bool,

    /// Report what a sync would create without creating it.
    #[arg(long)]
    pub dry_run: bool,

    // -- backend ------------------------------------------------------------
    #[arg(long, help_heading = "Backend")]
    pub management_token: Option<String>,

    /// Short form of --management-token.
    #[arg(long, help_heading = "Backend")]
    pub mt: Option<String>,

    #[arg(long, env = "CMS_SPACE_ID", help_heading = "Backend")]
    pub space_id: Option<String>,

    #[arg(long, env = "CMS_API_URL", hide = true)]
    pub api_url: Option<String>,

    // -- policy -------------------------------------------------------------
    /// Comma-separated environments that need --force-yes.
    #[arg(long, env = "CMS_RELEASE_ENVIRONMENT_PROTECTED", help_heading = "Policy")]
    pub protected_environments: Option<String>,

    /// Pattern release environment names must match.
    #[arg(long, env = "CMS_RELEASE_ENVIRONMENT_REGEX", help_heading = "Policy")]
    pub release_regex: Option<String>,

    /// Do not check release environment names.
    #[arg(long, help_heading = "Policy")]
    pub no_release_regex: bool,

    #[arg(long, help_heading = "Policy")]
    pub max_scheduled_actions: Option<u32>,

    #[arg(long, help_heading = "Policy")]
    pub max_entries: Option<u32>,

    /// Maximum availability probes after --duplicate.
    #[arg(long, help_heading = "Policy")]
    pub poll_attempts: Option<u32>,

    /// Overall availability deadline in seconds.
    #[arg(long, help_heading = "Policy")]
    pub poll_timeout: Option<u64>,

    // -- output -------------------------------------------------------------
    /// YAML settings file.
    #[arg(long, env = "CMS_RELEASE_CONFIG")]
    pub config_file: Option<std::path::PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// More logging; repeat for trace.
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Warnings and errors only.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Exactly one action flag.
    pub fn operation(&self) -> Result<OperationKind, ConfigurationError> {
        let chosen: Vec<OperationKind> = [
            (self.duplicate, OperationKind::Duplicate),
            (self.sync_entries, OperationKind::SyncEntries),
            (self.sync_schedule, OperationKind::SyncSchedule),
            (self.link, OperationKind::Link),
            (self.delete, OperationKind::Delete),
        ]
        .into_iter()
        .filter_map(|(set, kind)| set.then_some(kind))
        .collect();

        match chosen.as_slice() {
            [] => Err(ConfigurationError::NoAction),
            [kind] => Ok(*kind),
            many => Err(ConfigurationError::ConflictingActions(
                many.iter()
                    .map(|kind| kind.flag())
                    .collect::<Vec<_>>()
                    .join(", "),
            )),
        }
    }

    /// `--management-token` or `--mt`, then `CMS_MANAGEMENT_TOKEN`.
    pub fn management_token(&self) -> Result<Option<String>, ConfigurationError> {
        match (&self.management_token, &self.mt) {
            (Some(_), Some(_)) => Err(ConfigurationError::ConflictingTokenFlags),
            (Some(token), None) | (None, Some(token)) => Ok(Some(token.clone())),
            (None, None) => Ok(std::env::var("CMS_MANAGEMENT_TOKEN")
                .ok()
                .filter(|token| !token.is_empty())),
        }
    }

    pub fn addressing(&self) -> Addressing {
        Addressing {
            from: self.from.clone(),
            to: self.to.clone(),
            environment_id: self.environment_id.clone(),
        }
    }

    pub fn verbosity(&self) -> i8 {
        if self.quiet {
            -1
        } else {
            self.verbose.min(2) as i8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cms-release").chain(args.iter().copied()))
            .expect("parse")
    }

    #[test]
    fn single_action_is_resolved() {
        let cli = parse(&["--sync-schedule", "--environment-id", "release-1"]);
        assert_eq!(cli.operation().expect("action"), OperationKind::SyncSchedule);
    }

    #[test]
    fn two_actions_conflict() {
        let cli = parse(&["--duplicate", "--delete"]);
        let err = cli.operation().expect_err("conflict");
        assert!(err.to_string().contains("--duplicate, --delete"));
    }

    #[test]
    fn both_token_flags_conflict() {
        let cli = parse(&["--management-token", "a", "--mt", "b"]);
        assert!(matches!(
            cli.management_token(),
            Err(ConfigurationError::ConflictingTokenFlags)
        ));
    }

    #[test]
    fn short_token_flag_is_accepted() {
        let cli = parse(&["--mt", "b"]);
        assert_eq!(cli.management_token().expect("token"), Some("b".to_string()));
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(parse(&[]).verbosity(), 0);
        assert_eq!(parse(&["-vv"]).verbosity(), 2);
        assert_eq!(parse(&["-q"]).verbosity(), -1);
    }
}
