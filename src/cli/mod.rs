pub mod build;
pub mod deps;
pub mod watch;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::config::Options;
use crate::error::Result;

/// spritesass - Sass preprocessor with sprite sheet generation
#[derive(Parser, Debug)]
#[command(name = "spritesass")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Preprocess stylesheets into a build directory
    Build(build::BuildArgs),

    /// Print the import dependencies of a stylesheet
    Deps(deps::DepsArgs),

    /// Build, then rebuild whenever a stylesheet changes
    Watch(watch::WatchArgs),
}

/// Flags shared by every command that compiles.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Options file (default: spritesass.yaml next to the first input)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Extra import directory (repeatable)
    #[arg(short = 'I', long = "include")]
    pub include: Vec<PathBuf>,

    /// Root directory for sprite globs
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// Directory generated sprite sheets are written to
    #[arg(long)]
    pub gen_img_dir: Option<PathBuf>,
}

impl OptionArgs {
    /// Manifest options with command-line overrides applied.
    ///
    /// Without `--config`, `spritesass.yaml` is looked up in the directory of
    /// `first_input`.
    pub fn load(&self, first_input: Option<&Path>) -> Result<Options> {
        let options = match &self.config {
            Some(path) => Options::load(path)?.rebased(parent_dir(path)),
            None => {
                let dir = first_input.map(input_dir).unwrap_or_else(|| PathBuf::from("."));
                Options::discover(&dir)?.rebased(&dir)
            }
        };
        Ok(self.apply(options))
    }

    fn apply(&self, mut options: Options) -> Options {
        options.include_paths.extend(self.include.iter().cloned());
        if let Some(dir) = &self.image_dir {
            options.image_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.gen_img_dir {
            options.gen_img_dir = Some(dir.clone());
        }
        options
    }
}

/// Directory a manifest for `input` would live in.
fn input_dir(input: &Path) -> PathBuf {
    if input.is_dir() {
        input.to_path_buf()
    } else {
        parent_dir(input).to_path_buf()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
