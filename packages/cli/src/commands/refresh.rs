use crate::config::Config;
use anyhow::{Context, Result};
use binder_editor::{HttpResolver, ResolutionEngine, TemplateDocument};
use binder_template::{Node, NodeBody};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Template file
    pub template: PathBuf,

    /// Save the template back after resolving
    #[arg(short, long)]
    pub write: bool,

    /// Config file (defaults to binder.config.json in the working directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Resolve every node of a template against the resolver service and
/// print what was found
pub async fn refresh(args: RefreshArgs, cwd: &str) -> Result<()> {
    let config = Config::resolve(args.config.as_deref(), cwd)?;
    debug!(
        resolver = %config.resolver_url,
        timeout_ms = config.timeout_ms,
        max_in_flight = config.max_in_flight,
        "loaded config"
    );

    let source = fs::read_to_string(&args.template)
        .with_context(|| format!("Cannot read template {}", args.template.display()))?;
    let mut doc = TemplateDocument::load_json(&source)
        .with_context(|| format!("Invalid template {}", args.template.display()))?;

    println!(
        "{} {} via {}",
        "🔄 Resolving".bright_blue().bold(),
        args.template.display(),
        config.resolver_url
    );

    let resolver = Arc::new(HttpResolver::new(config.resolver_url.clone()));
    let mut engine = ResolutionEngine::with_config(resolver, config.resolution_config());
    let report = engine.run_until_idle(&mut doc).await;

    println!();
    for line in render_status(doc.tree()) {
        println!("{}", line);
    }
    println!();

    for (node_id, failure) in &report.failures {
        eprintln!("  {} {} - {}", "✗".red(), node_id, failure);
    }

    if args.write {
        if doc.is_dirty() {
            fs::write(&args.template, doc.to_json()?)?;
            doc.mark_saved();
            println!("{} Saved {}", "✓".green(), args.template.display());
        } else {
            println!("No changes to save");
        }
    } else if doc.is_dirty() {
        println!(
            "{}",
            "Template bindings changed; run with --write to save".yellow()
        );
    }

    println!(
        "{} {} resolved, {} failed",
        "Done:".green().bold(),
        report.applied,
        report.failed()
    );
    Ok(())
}

/// One line per node, indented by depth
pub fn render_status(tree: &Node) -> Vec<String> {
    let mut lines = Vec::new();
    render_node(tree, 0, &mut lines);
    lines
}

fn render_node(node: &Node, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    let name = node.bookmark_name.as_deref().unwrap_or("(no bookmark)");

    let line = match &node.body {
        NodeBody::Section(section) => {
            format!("{}{} {} [{}]", indent, "▸".bold(), name, section.base_directory)
        }
        _ if node.stale => format!("{}{} {} unresolved", indent, "?".yellow(), name),
        NodeBody::Matcher(matcher) if matcher.exists() => {
            let pages: u32 = matcher
                .resolved_files
                .iter()
                .filter_map(|file| file.page_count)
                .sum();
            format!(
                "{}{} {} {} file(s), {} page(s)",
                indent,
                "✓".green(),
                name,
                matcher.resolved_files.len(),
                pages
            )
        }
        NodeBody::Document(document) if document.exists => {
            format!("{}{} {} {}", indent, "✓".green(), name, document.document_path)
        }
        _ => format!("{}{} {} not found", indent, "✗".red(), name),
    };
    lines.push(line);

    for child in node.children().unwrap_or_default() {
        render_node(child, depth + 1, lines);
    }
}
