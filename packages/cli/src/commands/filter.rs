use super::{read_template, write_output};
use anyhow::Result;
use binder_template::{filter_by_method_codes, to_json, walk};
use clap::Args;
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Template file
    pub template: PathBuf,

    /// Method codes present in the job (repeatable)
    #[arg(short = 'm', long = "method-code", required = true)]
    pub method_codes: Vec<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Drop sections restricted to method codes the job does not have
pub fn filter(args: FilterArgs) -> Result<()> {
    let tree = read_template(&args.template)?;
    let available: BTreeSet<String> = args.method_codes.into_iter().collect();

    let filtered = filter_by_method_codes(&tree, &available);
    let removed = walk(&tree).count() - walk(&filtered).count();

    write_output(args.output.as_deref(), &to_json(&filtered)?)?;

    eprintln!(
        "{} Kept {} nodes, removed {}",
        "✓".green(),
        walk(&filtered).count(),
        removed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use binder_template::from_json;
    use std::fs;

    #[test]
    fn test_filter_writes_matching_sections() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("template.json");
        let output = dir.path().join("filtered.json");
        fs::write(
            &input,
            r#"{
                "type": "Section",
                "id": "root",
                "children": [
                    {"type": "Section", "id": "voc", "method_codes": ["8260"], "children": []},
                    {"type": "Section", "id": "metals", "method_codes": ["6010"], "children": []}
                ]
            }"#,
        )
        .unwrap();

        filter(FilterArgs {
            template: input,
            method_codes: vec!["6010".into()],
            output: Some(output.clone()),
        })
        .unwrap();

        let filtered = from_json(&fs::read_to_string(output).unwrap()).unwrap();
        let ids: Vec<&str> = filtered
            .children()
            .unwrap()
            .iter()
            .map(|child| child.id.as_str())
            .collect();
        assert_eq!(ids, vec!["metals"]);
    }
}
