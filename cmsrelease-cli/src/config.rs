//! Assemble a [`SyncConfig`] from flags, environment, `.env` files and the
//! settings file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use cmsrelease_core::{Settings, SyncConfig};

use crate::args::Cli;

/// Load `.env.local` then `.env` from `cwd`. Variables already set win, so
/// `.env.local` beats `.env` and the real environment beats both.
pub fn load_dotenv(cwd: &Path) {
    for name in [".env.local", ".env"] {
        let path = cwd.join(name);
        if path.is_file() {
            if let Err(err) = dotenvy::from_path(&path) {
                eprintln!("warning: ignoring {}: {err}", path.display());
            }
        }
    }
}

/// The settings file named on the command line, else the first one found.
pub fn load_settings(cli: &Cli, cwd: &Path) -> Result<Option<(PathBuf, Settings)>> {
    match &cli.config_file {
        Some(path) => {
            let settings = Settings::load_at(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?;
            Ok(Some((path.clone(), settings)))
        }
        None => Settings::discover(cwd).context("failed to load settings file"),
    }
}

pub fn build(cli: &Cli, cwd: &Path) -> Result<SyncConfig> {
    let operation = cli.operation()?;
    let management_token = cli.management_token()?;

    let settings = match load_settings(cli, cwd)? {
        Some((path, settings)) => {
            tracing::debug!("using settings from {}", path.display());
            settings
        }
        None => Settings::default(),
    };

    let config = SyncConfig::builder(operation)
        .settings(settings)
        .management_token(management_token)
        .space_id(cli.space_id.clone())
        .addressing(cli.addressing())
        .main_environment(cli.main_environment.clone())
        .alias(cli.alias.clone())
        .protected_environments(cli.protected_environments.clone())
        .release_regex(cli.release_regex.clone())
        .enforce_naming_policy(cli.no_release_regex.then_some(false))
        .force_yes(cli.force_yes)
        .update_api_key(cli.update_api_key)
        .prune_old_releases(cli.prune_old_releases)
        .dry_run(cli.dry_run)
        .max_scheduled_actions(cli.max_scheduled_actions)
        .max_entries(cli.max_entries)
        .poll_max_attempts(cli.poll_attempts)
        .poll_timeout(cli.poll_timeout.map(Duration::from_secs))
        .build()?;
    Ok(config)
}
