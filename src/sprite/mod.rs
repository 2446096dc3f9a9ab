//! Sprite sheet packing.
//!
//! A [`SpriteSheet`] is built from one or more globs relative to the image
//! directory. Matches keep glob-argument order, then filesystem order, and
//! duplicates are kept. Once the sheet is combined its image list is frozen;
//! combining and exporting again reuse the first result.

mod layout;
mod png;

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::config::{relative_path, Paths};
use crate::error::{Result, SassError};

pub use layout::{pack, Layout, Packed, Placement};
pub use png::{data_uri, decode, encode_png, write_png};

/// Key of the single-pixel placeholder entry in rendered maps.
pub const SENTINEL_KEY: &str = "pixel";

/// Width or height reported for a name the sheet does not contain.
pub const MISSING_DIMENSION: i64 = -1;

/// Position reported for a name the sheet does not contain.
pub const MISSING_POSITION: &str = "0px 0px";

/// One decoded source image.
#[derive(Debug, Clone)]
pub struct SpriteImage {
    pub path: PathBuf,
    pub image: RgbaImage,
}

impl SpriteImage {
    /// File name without its extension; the key used in rendered maps.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Packed collection of images exported as one PNG.
#[derive(Debug)]
pub struct SpriteSheet {
    images: Vec<SpriteImage>,
    layout: Layout,
    image_dir: PathBuf,
    output_path: PathBuf,
    url: String,
    composite: Option<RgbaImage>,
    packed: Option<Packed>,
    exported: Option<PathBuf>,
    combines: usize,
    writes: usize,
}

impl SpriteSheet {
    /// Empty sheet whose output name derives from `first_glob`.
    pub fn new(paths: &Paths, first_glob: &str, layout: Layout) -> Self {
        let file_name = output_file_name(first_glob, &random_suffix());
        let url = format!("{}/{}", relative_path(&paths.build_dir, &paths.gen_img_dir), file_name);

        Self {
            images: Vec::new(),
            layout,
            image_dir: paths.image_dir.clone(),
            output_path: paths.gen_img_dir.join(&file_name),
            url,
            composite: None,
            packed: None,
            exported: None,
            combines: 0,
            writes: 0,
        }
    }

    /// Expand and decode `globs`, in order.
    pub fn from_globs(paths: &Paths, globs: &[String], layout: Layout) -> Result<Self> {
        let first = globs.first().ok_or_else(|| SassError::Sprite {
            message: "sprite-map needs at least one glob".to_string(),
            help: Some("e.g. sprite-map(\"icons/*.png\")".to_string()),
        })?;

        let mut sheet = Self::new(paths, first, layout);
        for pattern in globs {
            let matches = expand_glob(&sheet.image_dir, pattern)?;
            if matches.is_empty() {
                return Err(SassError::Sprite {
                    message: format!(
                        "'{}' matched no files in {}",
                        pattern,
                        sheet.image_dir.display()
                    ),
                    help: Some("glob patterns are relative to image_dir".to_string()),
                });
            }
            for path in matches {
                let image = decode(&path)?;
                sheet.add_image(path, image)?;
            }
        }
        Ok(sheet)
    }

    /// Append an image. Fails once the sheet has been combined.
    pub fn add_image(&mut self, path: PathBuf, image: RgbaImage) -> Result<()> {
        if self.is_combined() {
            return Err(SassError::Sprite {
                message: format!(
                    "cannot add {} to {}: sheet is already combined",
                    path.display(),
                    self.url
                ),
                help: None,
            });
        }
        self.images.push(SpriteImage { path, image });
        Ok(())
    }

    pub fn images(&self) -> &[SpriteImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn is_combined(&self) -> bool {
        self.composite.is_some()
    }

    /// URL of the exported sheet relative to the build directory.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Where [`SpriteSheet::export`] writes the sheet.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Layout of the current image list.
    pub fn packed(&self) -> Packed {
        match &self.packed {
            Some(packed) => packed.clone(),
            None => pack(&self.sizes(), self.layout),
        }
    }

    fn sizes(&self) -> Vec<(u32, u32)> {
        self.images.iter().map(|i| i.image.dimensions()).collect()
    }

    /// Composite every image onto one canvas.
    pub fn combine(&mut self) -> &RgbaImage {
        if self.composite.is_none() {
            let packed = pack(&self.sizes(), self.layout);
            let mut canvas = RgbaImage::new(packed.width, packed.height);
            for (source, place) in self.images.iter().zip(&packed.placements) {
                image::imageops::replace(&mut canvas, &source.image, i64::from(place.x), i64::from(place.y));
            }
            self.combines += 1;
            self.packed = Some(packed);
            self.composite = Some(canvas);
        }
        self.composite.get_or_insert_with(|| RgbaImage::new(0, 0))
    }

    /// Write the composite to the generated-image directory.
    pub fn export(&mut self) -> Result<PathBuf> {
        if let Some(path) = &self.exported {
            return Ok(path.clone());
        }

        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SassError::ImageExport {
                path: parent.to_path_buf(),
                message: format!("Failed to create directory: {}", e),
            })?;
        }
        let path = self.output_path.clone();
        write_png(self.combine(), &path)?;
        self.writes += 1;

        log::info!("wrote sprite sheet {} ({} images)", path.display(), self.images.len());
        self.exported = Some(path.clone());
        Ok(path)
    }

    /// Index of the image `name` refers to.
    ///
    /// `name` may be the full path, the path relative to the image
    /// directory, the file name, or the file name without extension.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        let wanted = Path::new(name);
        self.images.iter().position(|image| {
            let path = &image.path;
            path == wanted
                || path.strip_prefix(&self.image_dir).is_ok_and(|rel| rel == wanted)
                || path.file_name().is_some_and(|f| f == name)
                || path.file_stem().is_some_and(|s| s == name)
        })
    }

    fn find(&self, name: &str) -> Option<Placement> {
        let found = self.lookup(name).map(|i| self.packed().placements[i]);
        if found.is_none() {
            log::warn!(
                "sprite {} has no image named \"{}\"; try one of: {}",
                self.url,
                name,
                self.names().join(" ")
            );
        }
        found
    }

    /// Stems of every image, in order.
    pub fn names(&self) -> Vec<String> {
        self.images.iter().map(SpriteImage::stem).collect()
    }

    /// Placement of `name`, or `None` (logged) when absent.
    pub fn record(&self, name: &str) -> Option<Placement> {
        self.find(name)
    }

    pub fn width(&self, name: &str) -> i64 {
        self.find(name).map_or(MISSING_DIMENSION, |p| i64::from(p.width))
    }

    pub fn height(&self, name: &str) -> i64 {
        self.find(name).map_or(MISSING_DIMENSION, |p| i64::from(p.height))
    }

    /// CSS background offset, e.g. `0px -139px`.
    pub fn position(&self, name: &str) -> String {
        match self.find(name) {
            Some(p) => format!("{}px {}px", -i64::from(p.x), -i64::from(p.y)),
            None => MISSING_POSITION.to_string(),
        }
    }

    /// `url("...") X Y` for use as a `background` value.
    pub fn css(&self, name: &str) -> String {
        format!("url(\"{}\") {}", self.url, self.position(name))
    }

    /// The composite as a PNG data URI.
    pub fn inline(&mut self) -> Result<String> {
        data_uri(self.combine())
    }

    /// Map literal binding every image under `variable`.
    ///
    /// The text replaces `sprite-map(...);` after `$variable: `.
    pub fn render_map(&self, variable: &str) -> String {
        let packed = self.packed();
        let mut out = String::from("();");

        let mut entry = |key: &str, width: u32, height: u32, x: u32, y: u32| {
            out.push_str(&format!(
                " ${v}: map_merge(${v},({key}: (width: {width}, height: {height}, x: {x}, y: {y}, url: '{url}')));",
                v = variable,
                url = self.url,
            ));
        };

        for (image, place) in self.images.iter().zip(&packed.placements) {
            entry(&image.stem(), place.width, place.height, place.x, place.y);
        }
        let (x, y) = packed.end();
        entry(SENTINEL_KEY, 1, 1, x, y);

        out
    }

    #[cfg(test)]
    fn counters(&self) -> (usize, usize) {
        (self.combines, self.writes)
    }
}

/// Files matching `pattern` under `image_dir`, in filesystem order.
pub fn expand_glob(image_dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = image_dir.join(pattern);
    let full = full.to_string_lossy();
    let entries = glob::glob(&full).map_err(|e| SassError::Glob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SassError::io(e.path().to_path_buf(), e.error()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}

/// `<dir>-<suffix>.png` where `<dir>` is the glob's directory part.
pub fn output_file_name(first_glob: &str, suffix: &str) -> String {
    let dir = Path::new(first_glob)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut stem: String = dir.chars().filter(|c| !matches!(c, '/' | '\\' | '*')).collect();
    if stem.is_empty() || stem == "." {
        stem = "image".to_string();
    }
    format!("{}-{}.png", stem, suffix)
}

/// Six random lowercase hex characters.
fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..6].to_string()
}
