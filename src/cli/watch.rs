//! Watch command implementation.
//!
//! Builds every input once, then watches the source and include
//! directories. A changed stylesheet is dropped from the import cache and
//! only the inputs that depend on it are rebuilt.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use clap::Args;
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::error::{Result, SassError};
use crate::host::BuildHost;
use crate::output::{display_path, plural, Printer};

use super::build::{build_file, collect_inputs, load_options};
use super::OptionArgs;

/// Events closer together than this are handled as one batch.
const SETTLE: Duration = Duration::from_millis(100);

/// Build, then rebuild whenever a stylesheet changes
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Stylesheets or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(long, short, default_value = "build")]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,
}

/// An input stylesheet and its canonical path.
struct Input {
    path: PathBuf,
    canonical: PathBuf,
}

pub fn run(args: WatchArgs, printer: &Printer) -> Result<()> {
    let options = load_options(&args.options, &args.inputs, &args.output)?;
    let roots = watch_roots(&args.inputs, &options.include_paths);
    let host = BuildHost::new(options);

    let inputs: Vec<Input> = collect_inputs(&args.inputs)
        .into_iter()
        .map(|path| {
            let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            Input { path, canonical }
        })
        .collect();
    let all: Vec<&Input> = inputs.iter().collect();
    rebuild(&host, &all, &args.output, printer);

    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).map_err(|e| SassError::io(&args.output, e))?;
    for root in &roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| SassError::io(root, e))?;
        printer.info("Watching", &display_path(root));
    }

    while let Ok(first) = rx.recv() {
        let mut changed = BTreeSet::new();
        collect_changes(first, &mut changed, printer);
        while let Ok(next) = rx.recv_timeout(SETTLE) {
            collect_changes(next, &mut changed, printer);
        }

        let stale = stale_inputs(&host, &inputs, &changed);
        if !stale.is_empty() {
            rebuild(&host, &stale, &args.output, printer);
        }
    }
    Ok(())
}

fn collect_changes(event: notify::Result<Event>, changed: &mut BTreeSet<PathBuf>, printer: &Printer) {
    match event {
        Ok(event) => {
            if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
                changed.extend(event.paths.into_iter().filter(|p| is_scss(p)));
            }
        }
        Err(err) => printer.error("Watch", &err.to_string()),
    }
}

/// Inputs whose output depends on any of `changed`.
///
/// Every changed file is dropped from the import cache on the way.
fn stale_inputs<'i>(host: &BuildHost, inputs: &'i [Input], changed: &BTreeSet<PathBuf>) -> Vec<&'i Input> {
    let mut affected: HashSet<PathBuf> = HashSet::new();
    for path in changed {
        log::debug!("changed: {}", path.display());
        affected.extend(host.invalidate(path));
        affected.insert(fs::canonicalize(path).unwrap_or_else(|_| path.clone()));
    }
    inputs.iter().filter(|i| affected.contains(&i.canonical)).collect()
}

/// Build each input, reporting failures without stopping.
fn rebuild(host: &BuildHost, inputs: &[&Input], output: &Path, printer: &Printer) {
    let mut failed = 0;
    for input in inputs {
        printer.status("Compiling", &display_path(&input.path));
        if let Err(err) = build_file(host, &input.path, output) {
            failed += 1;
            printer.error("Failed", &err.to_string());
        }
    }
    if failed > 0 {
        printer.warning("Finished", &format!("{} failed", plural(failed, "stylesheet", "stylesheets")));
    } else {
        printer.status("Finished", &plural(inputs.len(), "stylesheet", "stylesheets"));
    }
}

/// Directories to watch: each input's directory plus the include paths.
fn watch_roots(inputs: &[PathBuf], include_paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots = BTreeSet::new();
    for input in inputs {
        let dir = if input.is_dir() {
            input.clone()
        } else {
            match input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            }
        };
        roots.insert(dir);
    }
    roots.extend(include_paths.iter().filter(|p| p.is_dir()).cloned());
    roots.into_iter().collect()
}

fn is_scss(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "scss")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn input(path: PathBuf) -> Input {
        let canonical = fs::canonicalize(&path).unwrap();
        Input { path, canonical }
    }

    #[test]
    fn test_partial_change_rebuilds_importers_only() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("_var.scss"), "$a: 1;").unwrap();
        fs::write(dir.path().join("a.scss"), "@import \"var\";").unwrap();
        fs::write(dir.path().join("b.scss"), "p { x: y; }").unwrap();

        let host = BuildHost::new(Options::default());
        let inputs = vec![input(dir.path().join("a.scss")), input(dir.path().join("b.scss"))];
        for i in &inputs {
            host.preprocess_file(&i.path).unwrap();
        }

        let changed = BTreeSet::from([dir.path().join("_var.scss")]);
        let stale: Vec<&Path> = stale_inputs(&host, &inputs, &changed)
            .into_iter()
            .map(|i| i.path.as_path())
            .collect();
        assert_eq!(stale, vec![dir.path().join("a.scss").as_path()]);
    }

    #[test]
    fn test_input_change_rebuilds_itself() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.scss"), "p { x: y; }").unwrap();
        let host = BuildHost::new(Options::default());
        let inputs = vec![input(dir.path().join("b.scss"))];

        let changed = BTreeSet::from([dir.path().join("b.scss")]);
        assert_eq!(stale_inputs(&host, &inputs, &changed).len(), 1);
    }

    #[test]
    fn test_watch_roots_deduplicate() {
        let dir = tempdir().unwrap();
        let roots = watch_roots(
            &[dir.path().join("a.scss"), dir.path().join("b.scss")],
            &[dir.path().join("missing")],
        );
        assert_eq!(roots, vec![dir.path().to_path_buf()]);
    }
}
