pub mod apply;
pub mod clean;
pub mod diff;
pub mod filter;
pub mod init;
pub mod refresh;

pub use apply::{apply, ApplyArgs};
pub use clean::{clean, CleanArgs};
pub use diff::{diff, DiffArgs};
pub use filter::{filter, FilterArgs};
pub use init::{init, InitArgs};
pub use refresh::{refresh, RefreshArgs};

use anyhow::{Context, Result};
use binder_template::{from_json, Node};
use std::fs;
use std::path::Path;

/// Read and validate a template file
pub(crate) fn read_template(path: &Path) -> Result<Node> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Cannot read template {}", path.display()))?;
    from_json(&source).with_context(|| format!("Invalid template {}", path.display()))
}

/// Write `json` to `output`, or print it when no output is given
pub(crate) fn write_output(output: Option<&Path>, json: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Cannot write {}", path.display())),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}
