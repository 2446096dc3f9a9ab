//! Built-in helpers: image URLs, sprite lookups and inline images.

use crate::config::relative_path;
use crate::sprite::{data_uri, decode, Layout, SpriteSheet};

use super::{FunctionRegistry, HelperContext, Value};

#[derive(Clone, Copy)]
enum Dimension {
    Width,
    Height,
}

impl Dimension {
    fn key(self) -> &'static str {
        match self {
            Dimension::Width => "width",
            Dimension::Height => "height",
        }
    }
}

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("image-url($path)", image_url);
    registry.register("image-width($image, $name: null)", |ctx, args| {
        image_dimension(ctx, args, Dimension::Width)
    });
    registry.register("image-height($image, $name: null)", |ctx, args| {
        image_dimension(ctx, args, Dimension::Height)
    });
    registry.register("sprite($map, $name)", |ctx, args| {
        with_sheet(ctx, args, |sheet, name| Value::unquoted(sheet.css(name)))
    });
    registry.register("sprite-file($map, $name)", sprite_file);
    registry.register("sprite-width($map, $name)", |ctx, args| {
        with_sheet(ctx, args, |sheet, name| Value::px(sheet.width(name)))
    });
    registry.register("sprite-height($map, $name)", |ctx, args| {
        with_sheet(ctx, args, |sheet, name| Value::px(sheet.height(name)))
    });
    registry.register("sprite-position($map, $name)", |ctx, args| {
        with_sheet(ctx, args, |sheet, name| Value::unquoted(sheet.position(name)))
    });
    registry.register("inline-image($path)", inline_image);
    registry.register("sprite-map($glob)", sprite_map);
}

fn image_url(ctx: &mut HelperContext, args: &[Value]) -> Value {
    let Some(path) = args.first().and_then(Value::as_str) else {
        return Value::error("image-url: $path must be a string");
    };
    let rel = relative_path(&ctx.paths.build_dir, &ctx.paths.image_dir);
    let url = if rel == "." {
        path.to_string()
    } else {
        format!("{}/{}", rel, path)
    };
    Value::unquoted(format!("url(\"{}\")", url))
}

fn image_dimension(ctx: &mut HelperContext, args: &[Value], dimension: Dimension) -> Value {
    let Some(image) = args.first() else {
        return Value::error(format!("image-{}: missing $image", dimension.key()));
    };

    // A record from sprite-file().
    if let Some(size) = image.get(dimension.key()).and_then(Value::as_number) {
        return Value::px(size as i64);
    }

    // A sprite map plus an image name.
    if args.get(1).is_some_and(|name| !name.is_null()) {
        return with_sheet(ctx, args, |sheet, name| match dimension {
            Dimension::Width => Value::px(sheet.width(name)),
            Dimension::Height => Value::px(sheet.height(name)),
        });
    }

    // A file under the image directory.
    let Some(path) = image.as_str() else {
        return Value::error(format!(
            "image-{}: expected a file name or sprite record, got {}",
            dimension.key(),
            image
        ));
    };
    match decode(&ctx.paths.image_dir.join(path)) {
        Ok(raster) => {
            let (width, height) = raster.dimensions();
            match dimension {
                Dimension::Width => Value::px(i64::from(width)),
                Dimension::Height => Value::px(i64::from(height)),
            }
        }
        Err(err) => Value::error(err.to_string()),
    }
}

fn sprite_file(ctx: &mut HelperContext, args: &[Value]) -> Value {
    with_sheet(ctx, args, |sheet, name| match sheet.record(name) {
        Some(place) => Value::Map(vec![
            (Value::unquoted("width"), Value::number(f64::from(place.width), "")),
            (Value::unquoted("height"), Value::number(f64::from(place.height), "")),
            (Value::unquoted("x"), Value::number(f64::from(place.x), "")),
            (Value::unquoted("y"), Value::number(f64::from(place.y), "")),
            (Value::unquoted("url"), Value::quoted(sheet.url())),
        ]),
        None => Value::warning(format!("sprite-file: {} has no image named {}", sheet.url(), name)),
    })
}

fn inline_image(ctx: &mut HelperContext, args: &[Value]) -> Value {
    let Some(path) = args.first().and_then(Value::as_str) else {
        return Value::error("inline-image: $path must be a string");
    };
    if let Some(uri) = ctx.inline.get(path) {
        return Value::unquoted(uri.clone());
    }

    let uri = match decode(&ctx.paths.image_dir.join(path)).and_then(|raster| data_uri(&raster)) {
        Ok(uri) => uri,
        Err(err) => return Value::error(err.to_string()),
    };
    ctx.inline.insert(path.to_string(), uri.clone());
    Value::unquoted(uri)
}

fn sprite_map(ctx: &mut HelperContext, args: &[Value]) -> Value {
    let Some(glob) = args.first().and_then(Value::as_str) else {
        return Value::error("sprite-map: $glob must be a string");
    };

    let built = SpriteSheet::from_globs(&ctx.paths, &[glob.to_string()], Layout::Vertical)
        .and_then(|mut sheet| sheet.export().map(|_| sheet));
    match built {
        Ok(sheet) => {
            let url = sheet.url().to_string();
            ctx.sprites.insert(url.clone(), sheet);
            Value::quoted(url)
        }
        Err(err) => Value::error(err.to_string()),
    }
}

/// Resolve `args[0]` to a sheet and `args[1]` to an image name.
fn with_sheet(ctx: &mut HelperContext, args: &[Value], f: impl FnOnce(&mut SpriteSheet, &str) -> Value) -> Value {
    let (Some(map), Some(name)) = (args.first(), args.get(1).and_then(Value::as_name)) else {
        return Value::error("expected a sprite map and an image name");
    };
    let Some(key) = ctx.sheet_key(map) else {
        return Value::error(format!("{} is not a sprite map", map));
    };
    match ctx.sprites.get_mut(&key) {
        Some(sheet) => f(sheet, &name),
        None => Value::error(format!("{} is not a sprite map", map)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Options, Paths};
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn fixture() -> (TempDir, HelperContext) {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("img")).unwrap();
        for (name, height) in [("139", 139), ("140", 140)] {
            RgbaImage::from_pixel(96, height, Rgba([1, 2, 3, 255]))
                .save(dir.path().join(format!("img/{name}.png")))
                .unwrap();
        }
        let options = Options {
            build_dir: Some(dir.path().join("build")),
            image_dir: Some(dir.path().join("img")),
            ..Options::default()
        };
        let paths = Paths::resolve(&options, dir.path());
        let sheet = SpriteSheet::from_globs(&paths, &["*.png".to_string()], Layout::Vertical).unwrap();
        let ctx = HelperContext::with_sprites(paths, [("sprites".to_string(), sheet)]);
        (dir, ctx)
    }

    fn call(ctx: &mut HelperContext, name: &str, args: &[Value]) -> Value {
        FunctionRegistry::with_builtins().call(ctx, name, args)
    }

    #[test]
    fn test_image_url_is_relative_to_build_dir() {
        let (_dir, mut ctx) = fixture();
        assert_eq!(
            call(&mut ctx, "image-url", &[Value::quoted("image.png")]),
            Value::unquoted("url(\"../img/image.png\")")
        );
    }

    #[test]
    fn test_sprite_lookups_by_variable_name() {
        let (_dir, mut ctx) = fixture();
        let map = Value::unquoted("$sprites");
        let name = Value::number(140.0, "");

        assert_eq!(call(&mut ctx, "sprite-width", &[map.clone(), name.clone()]), Value::px(96));
        assert_eq!(call(&mut ctx, "sprite-height", &[map.clone(), name.clone()]), Value::px(140));
        assert_eq!(
            call(&mut ctx, "sprite-position", &[map.clone(), name.clone()]),
            Value::unquoted("0px -139px")
        );
        assert_eq!(call(&mut ctx, "image-height", &[map, name]), Value::px(140));
    }

    #[test]
    fn test_sprite_lookup_by_map_literal() {
        let (_dir, mut ctx) = fixture();
        let url = ctx.sprites["sprites"].url().to_string();
        let map = Value::Map(vec![(
            Value::number(139.0, ""),
            Value::Map(vec![(Value::unquoted("url"), Value::quoted(url.clone()))]),
        )]);

        assert_eq!(
            call(&mut ctx, "sprite", &[map, Value::quoted("139")]),
            Value::unquoted(format!("url(\"{url}\") 0px 0px"))
        );
    }

    #[test]
    fn test_missing_image_degrades_to_sentinel() {
        let (_dir, mut ctx) = fixture();
        let args = [Value::quoted("sprites"), Value::quoted("nope")];
        assert_eq!(call(&mut ctx, "sprite-width", &args), Value::px(-1));
        assert_eq!(call(&mut ctx, "sprite-position", &args), Value::unquoted("0px 0px"));
        assert!(matches!(call(&mut ctx, "sprite-file", &args), Value::Warning(_)));
    }

    #[test]
    fn test_sprite_file_record_feeds_image_width() {
        let (_dir, mut ctx) = fixture();
        let record = call(&mut ctx, "sprite-file", &[Value::quoted("sprites"), Value::quoted("139")]);
        assert_eq!(record.get("y").and_then(Value::as_number), Some(0.0));
        assert_eq!(call(&mut ctx, "image-width", &[record]), Value::px(96));
    }

    #[test]
    fn test_image_dimensions_from_file() {
        let (_dir, mut ctx) = fixture();
        assert_eq!(call(&mut ctx, "image-height", &[Value::quoted("139.png")]), Value::px(139));
        assert!(matches!(
            call(&mut ctx, "image-width", &[Value::quoted("missing.png")]),
            Value::Error(_)
        ));
    }

    #[test]
    fn test_unknown_sheet_is_an_error() {
        let (_dir, mut ctx) = fixture();
        let value = call(&mut ctx, "sprite-width", &[Value::quoted("other"), Value::quoted("139")]);
        assert!(matches!(value, Value::Error(_)));
    }

    #[test]
    fn test_inline_image_is_cached() {
        let (_dir, mut ctx) = fixture();
        let first = call(&mut ctx, "inline-image", &[Value::quoted("139.png")]);
        assert!(first.as_str().unwrap().starts_with("url('data:image/png;base64,"));
        assert_eq!(ctx.inline.len(), 1);
        assert_eq!(call(&mut ctx, "inline-image", &[Value::quoted("139.png")]), first);
    }

    #[test]
    fn test_sprite_map_helper_exports() {
        let (dir, mut ctx) = fixture();
        let url = call(&mut ctx, "sprite-map", &[Value::quoted("*.png")]);
        let url = url.as_str().unwrap().to_string();

        assert!(url.starts_with("./image-"));
        assert!(ctx.sprites.contains_key(&url));
        assert!(Path::new(&dir.path().join("build")).read_dir().unwrap().next().is_some());
        assert_eq!(
            call(&mut ctx, "sprite-height", &[Value::quoted(url), Value::quoted("140")]),
            Value::px(140)
        );
    }
}
