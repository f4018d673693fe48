use anyhow::Result;
use colored::Colorize;
use retrace_core::SnapshotStore;
use std::path::PathBuf;

pub fn run(limit: Option<usize>, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let store = SnapshotStore::open(&config)?;

    let mut versions = store.versions()?;
    if versions.is_empty() {
        println!("{}", "No versions found.".yellow());
        return Ok(());
    }
    versions.reverse();

    println!("{}", "Version History".bold().cyan());
    println!();

    let to_show = limit.unwrap_or(versions.len()).min(versions.len());

    for info in versions.iter().take(to_show) {
        println!(
            "{} {}",
            "version".yellow().bold(),
            info.id.to_string().yellow()
        );
        match info.timestamp {
            Some(ts) => println!("{}: {}", "Date".bold(), ts.format("%Y-%m-%d %H:%M:%S")),
            None => println!("{}: {}", "Date".bold(), "unknown".dimmed()),
        }
        println!(
            "{}: {}",
            "Files".bold(),
            info.entry_count.to_string().cyan()
        );
        println!();
        println!("    {}", info.message.trim_end());
        println!();
    }

    if versions.len() > to_show {
        println!(
            "{}",
            format!("... and {} more versions", versions.len() - to_show).dimmed()
        );
        println!("Use {} to see more", "--limit N".cyan());
    }

    Ok(())
}
