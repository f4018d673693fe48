use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use retrace_core::{
    BackupGuard, RestoreCoordinator, RestoreOptions, RestoreOutcome, SnapshotStore,
};
use std::path::PathBuf;

pub fn run(backup: String, path: PathBuf, force: bool, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let store = SnapshotStore::open(&config)?;
    let guard = BackupGuard::open(&config)?;
    let coordinator = RestoreCoordinator::new(&store, &guard);

    let id = guard.resolve(&backup)?;

    let report = coordinator.restore_from_backup(&path, &id, &RestoreOptions { force }, || {
        Confirm::new()
            .with_prompt(format!(
                "Overwrite {} with backup {}? The current state will be backed up first",
                path.display(),
                id
            ))
            .default(false)
            .interact()
            .unwrap_or(false)
    })?;

    match &report.outcome {
        RestoreOutcome::Cancelled => {
            println!("{}", "Restore canceled.".yellow());
        }
        RestoreOutcome::Completed { backup: safety } => {
            super::print_report(&report);
            println!();
            if report.has_failures() {
                println!("{}", "⚠ Restore finished with failures".yellow().bold());
            } else {
                println!(
                    "{}",
                    format!("✓ Restored from backup {id}").green().bold()
                );
            }
            println!("  {}: {}", "Safety backup".bold(), safety);
        }
    }

    Ok(())
}
