//! Named helper functions exposed to the downstream engine.
//!
//! The registry maps a signature such as `sprite-width($map, $name)` to a
//! callback. The engine calls helpers by name with evaluated arguments; the
//! callbacks share a [`HelperContext`] holding the sprite sheets built while
//! preprocessing.

mod builtins;
mod value;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::config::Paths;
use crate::sprite::SpriteSheet;

pub use value::{Separator, Value};

/// Helper callback.
pub type Callback = Arc<dyn Fn(&mut HelperContext, &[Value]) -> Value + Send + Sync>;

/// State shared by helper calls during one compile.
#[derive(Debug)]
pub struct HelperContext {
    pub paths: Paths,
    /// Sheets keyed by variable name (without `$`) or by URL for sheets
    /// created through the `sprite-map` helper.
    pub sprites: HashMap<String, SpriteSheet>,
    /// Data URIs already produced by `inline-image`.
    pub inline: HashMap<String, String>,
}

impl HelperContext {
    pub fn new(paths: Paths) -> Self {
        Self {
            paths,
            sprites: HashMap::new(),
            inline: HashMap::new(),
        }
    }

    pub fn with_sprites(paths: Paths, sprites: impl IntoIterator<Item = (String, SpriteSheet)>) -> Self {
        Self {
            sprites: sprites.into_iter().collect(),
            ..Self::new(paths)
        }
    }

    /// Find the sheet an argument refers to.
    ///
    /// Accepts a sprite variable name (with or without `$`), a sheet URL, or
    /// an evaluated sprite map whose entries carry the sheet URL.
    pub fn sheet_key(&self, value: &Value) -> Option<String> {
        match value {
            Value::String { text, .. } => {
                let name = text.trim_start_matches('$');
                if self.sprites.contains_key(name) {
                    return Some(name.to_string());
                }
                self.key_for_url(text)
            }
            Value::Map(entries) => entries
                .iter()
                .find_map(|(_, record)| record.get("url").and_then(Value::as_str))
                .and_then(|url| self.key_for_url(url)),
            _ => None,
        }
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        self.sprites
            .iter()
            .find(|(_, sheet)| sheet.url() == url)
            .map(|(key, _)| key.clone())
    }
}

/// A registered helper.
#[derive(Clone)]
pub struct Function {
    pub signature: String,
    pub callback: Callback,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("signature", &self.signature).finish()
    }
}

/// Name → helper table.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in helper.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register(&mut registry);
        registry
    }

    /// Register `callback` under `signature`, replacing any helper of the
    /// same name.
    pub fn register<F>(&mut self, signature: &str, callback: F)
    where
        F: Fn(&mut HelperContext, &[Value]) -> Value + Send + Sync + 'static,
    {
        let name = function_name(signature).to_string();
        self.functions.insert(
            name,
            Function {
                signature: signature.to_string(),
                callback: Arc::new(callback),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Every signature, sorted by name.
    pub fn signatures(&self) -> Vec<String> {
        self.functions.values().map(|f| f.signature.clone()).collect()
    }

    /// Call `name`; unknown names produce [`Value::Error`].
    pub fn call(&self, context: &mut HelperContext, name: &str, args: &[Value]) -> Value {
        match self.functions.get(name) {
            Some(function) => (function.callback)(context, args),
            None => Value::error(format!("no helper function named {}", name)),
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Name part of `name($arg, ...)`.
pub fn function_name(signature: &str) -> &str {
    signature.split('(').next().unwrap_or(signature).trim()
}
