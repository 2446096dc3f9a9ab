//! Deps command implementation.
//!
//! Prints one `importer -> imported` line per dependency edge on stdout.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Args;

use crate::error::{Result, SassError};
use crate::host::BuildHost;
use crate::output::{display_path, plural, Printer};

use super::OptionArgs;

/// Print the import dependencies of a stylesheet
#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Stylesheet to inspect
    pub input: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,
}

pub fn run(args: DepsArgs, printer: &Printer) -> Result<()> {
    let options = args.options.load(Some(args.input.as_path()))?;
    let host = BuildHost::new(options);
    let edges = dependency_edges(&host, &args.input)?;

    let mut stdout = io::stdout().lock();
    for (owner, imported) in &edges {
        writeln!(stdout, "{} -> {}", display_path(owner), display_path(imported))
            .map_err(|e| SassError::io("<stdout>", e))?;
    }

    printer.info(
        "Resolved",
        &format!("{} for {}", plural(edges.len(), "import", "imports"), display_path(&args.input)),
    );
    Ok(())
}

/// Every `(importer, imported)` edge reachable from `input`.
pub fn dependency_edges(host: &BuildHost, input: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
    host.preprocess_file(input)?;
    Ok(host.with_graph(|graph| graph.edges()))
}
