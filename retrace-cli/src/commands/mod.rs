pub mod checkout;
pub mod commit;
pub mod compare;
pub mod log;
pub mod restore;
pub mod tag;

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;
use retrace_core::{Config, DiffLineKind, FileDiff, FileStatus, RestoreReport};

pub fn load_config(custom_path: Option<PathBuf>) -> Result<Config> {
    Ok(Config::load(custom_path.as_deref())?)
}

pub fn print_file_diff(diff: &FileDiff) {
    let (deletions, additions) = diff.change_counts();
    println!(
        "{} {} {}",
        diff.path.display().to_string().bold(),
        format!("+{additions}").green(),
        format!("-{deletions}").red()
    );
    for line in &diff.lines {
        match line.kind {
            DiffLineKind::Addition => println!("{}", format!("+ {}", line.content).green()),
            DiffLineKind::Deletion => println!("{}", format!("- {}", line.content).red()),
            DiffLineKind::Context => println!("  {}", line.content.dimmed()),
        }
    }
}

pub fn print_report(report: &RestoreReport) {
    for file in &report.files {
        match &file.status {
            FileStatus::Restored => println!("  {} {}", "✓".green(), file.path.display()),
            FileStatus::Removed => println!(
                "  {} {} {}",
                "-".yellow(),
                file.path.display(),
                "removed".yellow()
            ),
            FileStatus::Failed(reason) => println!(
                "  {} {} - {}",
                "✗".red(),
                file.path.display(),
                reason.red()
            ),
        }
    }
}
