use super::read_template;
use anyhow::Result;
use binder_template::{differences, Difference};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Template before
    pub before: PathBuf,

    /// Template after
    pub after: PathBuf,
}

/// Print where two templates differ. Returns whether they are equivalent.
pub fn diff(args: DiffArgs) -> Result<bool> {
    let before = read_template(&args.before)?;
    let after = read_template(&args.after)?;

    let changes = differences(&before, &after);
    if changes.is_empty() {
        println!("{} Templates are equivalent", "✓".green());
        return Ok(true);
    }

    for change in &changes {
        println!("  {}", describe(change));
    }
    println!();
    println!("{} {} difference(s)", "✗".red(), changes.len());
    Ok(false)
}

fn describe(change: &Difference) -> String {
    match change {
        Difference::Modified { path } => format!("{} {}", "~".yellow(), path),
        Difference::KindChanged { path } => format!("{} {} node kind changed", "!".red(), path),
        Difference::ChildrenChanged {
            path,
            before,
            after,
        } => format!(
            "{} {} children {} → {}",
            "±".cyan(),
            path,
            before,
            after
        ),
    }
}
