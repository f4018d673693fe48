use anyhow::Result;
use colored::Colorize;
use retrace_core::{FileDiff, ReconstructionEngine, SnapshotStore};
use std::collections::BTreeSet;
use std::path::PathBuf;

pub fn run(version_a: String, version_b: String, config: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config)?;
    let store = SnapshotStore::open(&config)?;
    let engine = ReconstructionEngine::new(&store);

    let (_, id_a) = store.resolve(&version_a)?;
    let (_, id_b) = store.resolve(&version_b)?;

    let state_a = engine.reconstruct(&id_a)?;
    let state_b = engine.reconstruct(&id_b)?;

    println!("{}", format!("Comparing {id_a} -> {id_b}").bold().cyan());
    println!();

    let paths: BTreeSet<PathBuf> = state_a
        .files
        .keys()
        .chain(state_b.files.keys())
        .cloned()
        .collect();

    let mut changed = 0;
    for path in &paths {
        match (state_a.files.get(path), state_b.files.get(path)) {
            (Some(a), Some(b)) if a == b => {}
            (Some(a), Some(b)) => {
                changed += 1;
                let old_text = String::from_utf8_lossy(a);
                let new_text = String::from_utf8_lossy(b);
                super::print_file_diff(&FileDiff::between(path.clone(), &old_text, &new_text));
                println!();
            }
            (Some(_), None) => {
                changed += 1;
                println!("{} {}", "removed".red().bold(), path.display());
            }
            (None, Some(_)) => {
                changed += 1;
                println!("{} {}", "added".green().bold(), path.display());
            }
            (None, None) => {}
        }
    }

    if changed == 0 {
        println!("{}", "No differences".green());
    } else {
        println!();
        println!("{}", format!("{changed} file(s) differ").bold());
    }

    for (path, error) in state_a.failures.iter().chain(state_b.failures.iter()) {
        println!(
            "{}",
            format!("✗ could not rebuild {}: {}", path.display(), error).red()
        );
    }

    Ok(())
}
