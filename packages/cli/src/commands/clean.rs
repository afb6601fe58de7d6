use super::{read_template, write_output};
use anyhow::Result;
use binder_template::to_json;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Template file
    pub template: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Rewrite a template without derived fields, as the editor saves it
pub fn clean(args: CleanArgs) -> Result<()> {
    let tree = read_template(&args.template)?;
    let json = to_json(&tree)?;
    write_output(args.output.as_deref(), &json)?;

    if let Some(output) = &args.output {
        eprintln!("{} Cleaned → {}", "✓".green(), output.display());
    }
    Ok(())
}
