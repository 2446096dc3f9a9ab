//! Build command implementation.
//!
//! Preprocesses each input stylesheet and writes the rewritten text to the
//! output directory. Directories are walked for non-partial `.scss` files.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use walkdir::WalkDir;

use crate::config::Options;
use crate::error::{Result, SassError};
use crate::host::BuildHost;
use crate::output::{display_path, plural, Printer};

use super::OptionArgs;

/// Preprocess stylesheets into a build directory
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Stylesheets or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(long, short, default_value = "build")]
    pub output: PathBuf,

    #[command(flatten)]
    pub options: OptionArgs,
}

pub fn run(args: BuildArgs, printer: &Printer) -> Result<()> {
    let options = load_options(&args.options, &args.inputs, &args.output)?;
    let inputs = collect_inputs(&args.inputs);
    if inputs.is_empty() {
        printer.warning("Skipping", "no stylesheets found");
        return Ok(());
    }

    let host = BuildHost::new(options);
    for input in &inputs {
        printer.status("Compiling", &display_path(input));
        build_file(&host, input, &args.output)?;
    }

    printer.status(
        "Finished",
        &format!("{} to {}", plural(inputs.len(), "stylesheet", "stylesheets"), display_path(&args.output)),
    );
    Ok(())
}

/// Options for a build writing to `output`.
///
/// The output directory doubles as the build directory unless the options
/// name one.
pub(crate) fn load_options(args: &OptionArgs, inputs: &[PathBuf], output: &Path) -> Result<Options> {
    let mut options = args.load(inputs.first().map(PathBuf::as_path))?;
    if options.build_dir.is_none() {
        options.build_dir = Some(output.to_path_buf());
    }
    Ok(options)
}

/// Preprocess `input` and write `<output>/<stem>.scss`.
pub fn build_file(host: &BuildHost, input: &Path, output: &Path) -> Result<PathBuf> {
    let preprocessed = host.preprocess_file(input)?;

    fs::create_dir_all(output).map_err(|e| SassError::io(output, e))?;
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let target = output.join(format!("{}.scss", stem));
    fs::write(&target, &preprocessed.output).map_err(|e| SassError::io(&target, e))?;

    for (name, sheet) in &preprocessed.state.sprites {
        log::info!("${} -> {}", name, sheet.url());
    }
    Ok(target)
}

/// Expand directories to the non-partial `.scss` files below them.
pub fn collect_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_stylesheet(p))
            .collect();
        found.sort();
        files.extend(found);
    }
    files
}

/// A `.scss` file that is not a partial.
fn is_stylesheet(path: &Path) -> bool {
    let is_scss = path.extension().is_some_and(|e| e == "scss");
    let partial = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'));
    is_scss && !partial
}
