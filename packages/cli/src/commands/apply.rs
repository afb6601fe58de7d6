use super::{read_template, write_output};
use crate::config::Config;
use anyhow::{Context, Result};
use binder_editor::{Mutation, TemplateDocument};
use clap::Args;
use colored::Colorize;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Template file
    pub template: PathBuf,

    /// JSON array of edits: mutation objects, "undo" or "redo"
    pub edits: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file (defaults to binder.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Step {
    History(HistoryStep),
    Edit(Mutation),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStep {
    Undo,
    Redo,
}

/// Replay a list of edits on a template
pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::resolve(args.config.as_deref(), cwd)?;
    let mut doc = TemplateDocument::from_tree(read_template(&args.template)?)?;

    let source = fs::read_to_string(&args.edits)
        .with_context(|| format!("Cannot read edits {}", args.edits.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&source)
        .with_context(|| format!("Invalid edits {}", args.edits.display()))?;

    let changed = run_steps(&mut doc, steps, &config)?;

    write_output(args.output.as_deref(), &doc.to_json()?)?;
    eprintln!(
        "{} {} edit(s) applied, template {}",
        "✓".green(),
        changed,
        if doc.is_dirty() { "changed" } else { "unchanged" }
    );
    Ok(())
}

/// Run `steps` against `doc` with an undo history sized by `config`.
/// Returns the number of edits applied.
pub fn run_steps(doc: &mut TemplateDocument, steps: Vec<Step>, config: &Config) -> Result<usize> {
    let mut history = config.undo_stack();
    let mut applied = 0;

    for (index, step) in steps.into_iter().enumerate() {
        match step {
            Step::Edit(mutation) => {
                let name = mutation.name();
                history
                    .apply(mutation, doc)
                    .with_context(|| format!("Edit #{} ({}) failed", index + 1, name))?;
                applied += 1;
            }
            Step::History(HistoryStep::Undo) => {
                if !history.undo(doc)? {
                    eprintln!("  {} Edit #{}: nothing to undo", "⚠️".yellow(), index + 1);
                }
            }
            Step::History(HistoryStep::Redo) => {
                if !history.redo(doc)? {
                    eprintln!("  {} Edit #{}: nothing to redo", "⚠️".yellow(), index + 1);
                }
            }
        }
    }

    Ok(applied)
}
