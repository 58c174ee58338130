//! cms-release: environment release tooling for a content platform.
//!
//! # Usage
//!
//! ```text
//! cms-release --duplicate [--from <env>] --to <release> [--update-api-key]
//! cms-release --sync-schedule --environment-id <release> [--dry-run]
//! cms-release --sync-entries --from <env> --to <env> [--force-yes]
//! cms-release --link --environment-id <release> [--alias <alias>] [--prune-old-releases]
//! cms-release --delete --environment-id <env> [--force-yes]
//! ```
//!
//! `--management-token`/`--mt` and `--space-id` are always required, either
//! as flags or through `CMS_MANAGEMENT_TOKEN` / `CMS_SPACE_ID`.

mod args;
mod config;
mod dispatch;
mod output;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use args::Cli;

fn main() -> ExitCode {
    let cwd = std::env::current_dir().unwrap_or_else(|_| ".".into());
    // Before parsing, so clap's `env` fallbacks see `.env` values.
    config::load_dotenv(&cwd);

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    cmsrelease_runtime::init_tracing(cli.verbosity());

    match dispatch::run(&cli, &cwd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
