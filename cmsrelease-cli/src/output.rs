//! Report rendering: a table for people, JSON for scripts.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cmsrelease_runtime::{DeleteReport, DuplicationReport, KeyStep, LinkReport};
use cmsrelease_sync::{ItemOutcome, ReconciliationReport};

pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to serialize report JSON")?
    );
    Ok(())
}

#[derive(Tabled)]
struct ItemRow {
    #[tabled(rename = "item")]
    key: String,
    #[tabled(rename = "outcome")]
    outcome: String,
    #[tabled(rename = "detail")]
    detail: String,
}

pub fn print_reconciliation(report: &ReconciliationReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}{} '{}' -> '{}': {} fetched, {} skipped, {} {}, {} failed",
        report.kind.bold(),
        report.source,
        report.destination,
        report.fetched,
        report.skipped,
        if report.dry_run {
            report.would_create
        } else {
            report.created
        },
        if report.dry_run { "to create" } else { "created" },
        report.failed,
    );

    if report.items.is_empty() {
        println!("nothing to do");
        return;
    }

    let rows: Vec<ItemRow> = report
        .items
        .iter()
        .map(|item| ItemRow {
            key: item.key.clone(),
            outcome: outcome_label(item.outcome),
            detail: item.error.clone().unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn outcome_label(outcome: ItemOutcome) -> String {
    match outcome {
        ItemOutcome::Created => "created".green().to_string(),
        ItemOutcome::WouldCreate => "would create".cyan().to_string(),
        ItemOutcome::SkippedDuplicate => "duplicate, skipped".bright_black().to_string(),
        ItemOutcome::Failed => "failed".red().bold().to_string(),
    }
}

pub fn print_duplication(report: &DuplicationReport) {
    let marker = if report.availability.is_ready() {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{marker} '{}' cloned from '{}': {}",
        report.environment, report.source, report.availability
    );
    match &report.api_key {
        KeyStep::Skipped => {}
        KeyStep::Updated => println!("  api key '{}' updated", report.source),
        KeyStep::KeyNotFound => println!(
            "  {} no api key named '{}'",
            "!".yellow(),
            report.source
        ),
        KeyStep::Failed(err) => println!("  {} api key update failed: {err}", "!".yellow()),
    }
}

pub fn print_link(report: &LinkReport) {
    if report.changed {
        println!(
            "{} alias '{}' -> '{}' (was '{}')",
            "✓".green(),
            report.alias,
            report.environment,
            report.previous
        );
    } else {
        println!(
            "· alias '{}' already points at '{}'",
            report.alias, report.environment
        );
    }
    for environment in &report.pruned {
        println!("  pruned '{environment}'");
    }
    for failure in &report.prune_failures {
        println!(
            "  {} could not prune '{}': {}",
            "!".yellow(),
            failure.environment,
            failure.error
        );
    }
}

pub fn print_delete(report: &DeleteReport) {
    println!("{} deleted '{}'", "✓".green(), report.environment);
}
