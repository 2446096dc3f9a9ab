//! Import dependency graph.
//!
//! Tracks which files each stylesheet imports so rebuild tooling can find the
//! top-level files affected by a change to a partial.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

/// Owning file → imported files, with the reverse index.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Adjacency list: file -> files it imports.
    dependencies: HashMap<PathBuf, HashSet<PathBuf>>,

    /// Reverse adjacency list: file -> files that import it.
    dependents: HashMap<PathBuf, HashSet<PathBuf>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `owner` imports `imported`.
    pub fn add_dependency(&mut self, owner: impl Into<PathBuf>, imported: impl Into<PathBuf>) {
        let owner = owner.into();
        let imported = imported.into();

        self.dependencies
            .entry(owner.clone())
            .or_default()
            .insert(imported.clone());

        self.dependents.entry(imported).or_default().insert(owner);
    }

    /// Files `owner` imports directly, sorted.
    pub fn dependencies_of(&self, owner: &Path) -> Vec<PathBuf> {
        sorted(self.dependencies.get(owner))
    }

    /// Files that import `file` directly, sorted.
    pub fn dependents_of(&self, file: &Path) -> Vec<PathBuf> {
        sorted(self.dependents.get(file))
    }

    /// Every file that imports `file` directly or through other partials.
    pub fn affected_by(&self, file: &Path) -> Vec<PathBuf> {
        let mut seen: BTreeSet<PathBuf> = BTreeSet::new();
        let mut queue: VecDeque<&Path> = VecDeque::from([file]);

        while let Some(current) = queue.pop_front() {
            if let Some(owners) = self.dependents.get(current) {
                for owner in owners {
                    if seen.insert(owner.clone()) {
                        queue.push_back(owner);
                    }
                }
            }
        }

        seen.remove(file);
        seen.into_iter().collect()
    }

    /// Forget the imports recorded for `owner` (before it is recompiled).
    pub fn clear_dependencies(&mut self, owner: &Path) {
        let Some(imported) = self.dependencies.remove(owner) else {
            return;
        };
        for file in imported {
            if let Some(owners) = self.dependents.get_mut(&file) {
                owners.remove(owner);
                if owners.is_empty() {
                    self.dependents.remove(&file);
                }
            }
        }
    }

    /// All edges as `(owner, imported)` pairs, sorted.
    pub fn edges(&self) -> Vec<(PathBuf, PathBuf)> {
        let mut edges: Vec<_> = self
            .dependencies
            .iter()
            .flat_map(|(owner, files)| files.iter().map(move |f| (owner.clone(), f.clone())))
            .collect();
        edges.sort();
        edges
    }

    /// Number of files that import something.
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

fn sorted(set: Option<&HashSet<PathBuf>>) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = set.map(|s| s.iter().cloned().collect()).unwrap_or_default();
    files.sort();
    files
}
