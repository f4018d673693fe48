use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use retrace_core::{
    BackupGuard, RestoreCoordinator, RestoreOptions, RestoreOutcome, SnapshotStore,
};
use std::path::PathBuf;

pub fn run(
    path: PathBuf,
    version: String,
    diff_only: bool,
    force: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = super::load_config(config)?;
    let store = SnapshotStore::open(&config)?;
    let guard = BackupGuard::open(&config)?;
    let coordinator = RestoreCoordinator::new(&store, &guard);

    let (_, id) = store.resolve(&version)?;
    let message = store.message(&id)?;

    if diff_only {
        println!("{}", "Restore Preview".bold().cyan());
        println!("  {}: {}", "Version".bold(), id);
        println!("  {}: {}", "Message".bold(), message.trim_end());
        println!();

        let preview = coordinator.preview(&path, &id)?;
        if preview.diffs.is_empty() && preview.removals.is_empty() && preview.failures.is_empty() {
            println!("{}", "Working tree already matches this version".green());
            return Ok(());
        }
        for diff in &preview.diffs {
            super::print_file_diff(diff);
            println!();
        }
        for removal in &preview.removals {
            println!(
                "{}",
                format!("- {} would be removed", removal.display()).yellow()
            );
        }
        for (failed, error) in &preview.failures {
            println!(
                "{}",
                format!("✗ {}: {}", failed.display(), error).red()
            );
        }
        return Ok(());
    }

    let report = coordinator.restore(&path, &id, &RestoreOptions { force }, || {
        Confirm::new()
            .with_prompt(format!(
                "Restore {} to version {}? The current state will be backed up first",
                path.display(),
                id
            ))
            .default(false)
            .interact()
            .unwrap_or(false)
    })?;

    match &report.outcome {
        RestoreOutcome::Cancelled => {
            println!("{}", "Retrace canceled.".yellow());
        }
        RestoreOutcome::Completed { backup } => {
            super::print_report(&report);
            println!();
            if report.has_failures() {
                println!("{}", "⚠ Restore finished with failures".yellow().bold());
            } else {
                println!("{}", format!("✓ Restored to version {id}").green().bold());
            }
            println!("  {}: {}", "Backup".bold(), backup);
        }
    }

    Ok(())
}
