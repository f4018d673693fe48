use anyhow::Result;
use colored::Colorize;
use retrace_core::BackupGuard;
use std::path::PathBuf;

pub fn run(config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let guard = BackupGuard::open(&config)?;

    let backups = guard.backups()?;
    if backups.is_empty() {
        println!("{}", "No backups found.".yellow());
        return Ok(());
    }

    println!("{}", "Available backups:".bold().cyan());
    for info in &backups {
        match info.timestamp {
            Some(ts) => println!(
                "  {} {}",
                info.id,
                format!("({})", ts.format("%Y-%m-%d %H:%M:%S")).dimmed()
            ),
            None => println!("  {}", info.id),
        }
    }

    Ok(())
}
