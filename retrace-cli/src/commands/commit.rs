use anyhow::Result;
use colored::Colorize;
use retrace_core::SnapshotStore;
use std::path::PathBuf;

pub fn run(path: PathBuf, message: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let store = SnapshotStore::open(&config)?;

    let message = message.unwrap_or_else(|| "No commit message provided".to_string());
    let id = store.commit(&path, &message)?;

    println!("{}", "✓ Version saved".green().bold());
    println!("  {}: {}", "Version".bold(), id);
    println!("  {}: {}", "Message".bold(), message);

    Ok(())
}
