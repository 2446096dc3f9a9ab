//! Build options (spritesass.yaml) and resolved directories.
//!
//! Every directory is optional in the manifest. Missing ones default relative
//! to the package directory of the file being compiled.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SassError};
use crate::import::CachePolicy;

/// Default manifest file name.
pub const MANIFEST_NAME: &str = "spritesass.yaml";

/// Build options loaded from spritesass.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Extra directories searched for imports, in order.
    pub include_paths: Vec<PathBuf>,

    /// Directory the rewritten stylesheets are written to.
    pub build_dir: Option<PathBuf>,

    /// Directory holding the stylesheet sources.
    pub sass_dir: Option<PathBuf>,

    /// Static asset root; `$rel` points here from the build directory.
    pub static_dir: Option<PathBuf>,

    /// Root that sprite globs are relative to. Defaults to `static_dir`.
    pub image_dir: Option<PathBuf>,

    /// Where generated sprite sheets are written. Defaults to `build_dir`.
    pub gen_img_dir: Option<PathBuf>,

    /// Imports that may be missing on disk (third-party frameworks).
    pub ignored_imports: Vec<String>,

    /// Upper bound on cached import files. Unbounded when absent.
    pub cache_max_entries: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            include_paths: vec![],
            build_dir: None,
            sass_dir: None,
            static_dir: None,
            image_dir: None,
            gen_img_dir: None,
            ignored_imports: vec!["compass".to_string(), "images".to_string()],
            cache_max_entries: None,
        }
    }
}

impl Options {
    /// Load options from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SassError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read options: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse options from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| SassError::Config {
            message: format!("Invalid options: {}", e),
            help: Some(format!("Check {} syntax", MANIFEST_NAME)),
        })
    }

    /// Load `spritesass.yaml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_NAME);
        if path.is_file() {
            log::debug!("loading options from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve relative directories against `base` (the manifest's directory).
    pub fn rebased(mut self, base: &Path) -> Self {
        let rebase = |dir: &mut PathBuf| {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        };
        self.include_paths.iter_mut().for_each(rebase);
        for dir in [
            &mut self.build_dir,
            &mut self.sass_dir,
            &mut self.static_dir,
            &mut self.image_dir,
            &mut self.gen_img_dir,
        ]
        .into_iter()
        .flatten()
        {
            rebase(dir);
        }
        self
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from_max_entries(self.cache_max_entries)
    }
}

/// Directories for one compile, with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub build_dir: PathBuf,
    pub sass_dir: PathBuf,
    pub static_dir: PathBuf,
    pub image_dir: PathBuf,
    pub gen_img_dir: PathBuf,
}

impl Paths {
    /// Apply defaults relative to `pkgdir`.
    pub fn resolve(options: &Options, pkgdir: &Path) -> Self {
        let or_pkg = |dir: &Option<PathBuf>| dir.clone().unwrap_or_else(|| pkgdir.to_path_buf());

        let build_dir = or_pkg(&options.build_dir);
        let sass_dir = or_pkg(&options.sass_dir);
        let static_dir = or_pkg(&options.static_dir);
        let image_dir = options.image_dir.clone().unwrap_or_else(|| static_dir.clone());
        let gen_img_dir = options.gen_img_dir.clone().unwrap_or_else(|| build_dir.clone());

        Self {
            build_dir,
            sass_dir,
            static_dir,
            image_dir,
            gen_img_dir,
        }
    }

    /// Path from the build directory to the static root, for `$rel`.
    pub fn rel(&self) -> String {
        relative_path(&self.build_dir, &self.static_dir)
    }
}

/// Lexical relative path from directory `from` to `to`, `/`-separated.
///
/// Both are made absolute against the working directory first; symlinks are
/// not resolved. Equal paths give `"."`.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from = normalize(from);
    let to = normalize(to);

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(from.len() - common)
        .chain(to[common..].iter().cloned())
        .collect();

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// Absolute path as a list of normal components with `.` and `..` applied.
fn normalize(path: &Path) -> Vec<String> {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut parts: Vec<String> = Vec::new();
    for component in absolute.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_empty_options() {
        let options = Options::parse("{}").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.ignored_imports, vec!["compass".to_string(), "images".to_string()]);
        assert_eq!(options.cache_policy(), CachePolicy::Unbounded);
    }

    #[test]
    fn test_parse_full_options() {
        let yaml = r#"
include_paths: [vendor/sass, lib]
build_dir: build
static_dir: public
image_dir: public/img
ignored_imports: [compass, bourbon]
cache_max_entries: 64
"#;
        let options = Options::parse(yaml).unwrap();

        assert_eq!(
            options.include_paths,
            vec![PathBuf::from("vendor/sass"), PathBuf::from("lib")]
        );
        assert_eq!(options.build_dir, Some(PathBuf::from("build")));
        assert_eq!(options.gen_img_dir, None);
        assert_eq!(options.ignored_imports.len(), 2);
        assert_eq!(options.cache_policy(), CachePolicy::Bounded { max_entries: 64 });
    }

    #[test]
    fn test_rebased_keeps_absolute_dirs() {
        let options = Options {
            include_paths: vec![PathBuf::from("lib"), PathBuf::from("/abs/lib")],
            build_dir: Some(PathBuf::from("build")),
            image_dir: Some(PathBuf::from("/srv/img")),
            ..Options::default()
        }
        .rebased(Path::new("/project"));

        assert_eq!(
            options.include_paths,
            vec![PathBuf::from("/project/lib"), PathBuf::from("/abs/lib")]
        );
        assert_eq!(options.build_dir, Some(PathBuf::from("/project/build")));
        assert_eq!(options.image_dir, Some(PathBuf::from("/srv/img")));
        assert_eq!(options.static_dir, None);
    }

    #[test]
    fn test_parse_invalid_options() {
        let err = Options::parse("include_paths: 12").unwrap_err();
        assert!(matches!(err, SassError::Config { .. }));
    }

    #[test]
    fn test_discover_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Options::discover(dir.path()).unwrap(), Options::default());
    }

    #[test]
    fn test_discover_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_NAME), "build_dir: out\n").unwrap();
        let options = Options::discover(dir.path()).unwrap();
        assert_eq!(options.build_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_paths_defaults() {
        let paths = Paths::resolve(&Options::default(), Path::new("/pkg"));
        assert_eq!(paths.build_dir, PathBuf::from("/pkg"));
        assert_eq!(paths.image_dir, PathBuf::from("/pkg"));
        assert_eq!(paths.gen_img_dir, PathBuf::from("/pkg"));
        assert_eq!(paths.rel(), ".");
    }

    #[test]
    fn test_paths_chain_defaults() {
        let options = Options {
            build_dir: Some(PathBuf::from("/pkg/build")),
            static_dir: Some(PathBuf::from("/pkg/static")),
            ..Options::default()
        };
        let paths = Paths::resolve(&options, Path::new("/pkg"));
        assert_eq!(paths.sass_dir, PathBuf::from("/pkg"));
        assert_eq!(paths.image_dir, PathBuf::from("/pkg/static"));
        assert_eq!(paths.gen_img_dir, PathBuf::from("/pkg/build"));
        assert_eq!(paths.rel(), "../static");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/b")), ".");
        assert_eq!(relative_path(Path::new("/a/b"), Path::new("/a/b/c/d")), "c/d");
        assert_eq!(relative_path(Path::new("/a/b/c"), Path::new("/a/x")), "../../x");
        assert_eq!(relative_path(Path::new("/a/./b/../b"), Path::new("/a")), "..");
    }
}
