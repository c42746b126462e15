use crate::error::Result;
use crate::markers::{is_excluded_dir, marker_for_filename};
use pommel_chunker::content_hash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A detected subproject root (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subproject {
    pub id: String,
    /// Project-relative, forward-slash path to the subproject root.
    pub path: String,
    pub name: String,
    pub marker_kind: String,
    pub priority: i64,
}

impl Subproject {
    fn new(path: String, marker_kind: &'static str, priority: i64) -> Self {
        let name = path.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(&path).to_string();
        let id = content_hash(&path);
        Self {
            id,
            path,
            name,
            marker_kind: marker_kind.to_string(),
            priority,
        }
    }
}

/// Walk `root` looking for marker files, descending into every directory
/// except [`crate::markers::EXCLUDED_DIR_NAMES`]. The project root itself
/// is always included as a subproject when no deeper marker claims it,
/// so every chunk always has a routing home.
pub fn detect_subprojects(root: impl AsRef<Path>) -> Result<Vec<Subproject>> {
    let root = root.as_ref();
    let mut found = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.depth() == 0 {
            return true;
        }
        entry
            .file_name()
            .to_str()
            .map(|name| entry.file_type().is_file() || !is_excluded_dir(name))
            .unwrap_or(true)
    });

    for entry in walker.filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        let Some((kind, priority)) = marker_for_filename(file_name) else {
            continue;
        };
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        let rel = relative_path(root, dir);
        if found.iter().any(|s: &Subproject| s.path == rel) {
            continue;
        }
        found.push(Subproject::new(rel, kind, priority));
    }

    if found.iter().all(|s| !s.path.is_empty()) {
        found.push(Subproject::new(String::new(), "root", 0));
    }

    found.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.path.cmp(&b.path)));
    Ok(found)
}

fn relative_path(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    rel.to_string_lossy().replace('\\', "/")
}

/// Find the subproject that owns `file_path`, using strict
/// path-component-boundary containment (`src/app` contains `src/app/x.rs`
/// but not `src/appendix/x.rs`) rather than naive string prefix matching.
/// Ties are broken by picking the deepest (most specific) matching path,
/// then by priority.
#[must_use]
pub fn containing_subproject<'a>(file_path: &str, subprojects: &'a [Subproject]) -> Option<&'a Subproject> {
    subprojects
        .iter()
        .filter(|s| path_contains(&s.path, file_path))
        .max_by(|a, b| {
            component_count(&a.path)
                .cmp(&component_count(&b.path))
                .then_with(|| a.priority.cmp(&b.priority))
        })
}

fn path_contains(subproject_path: &str, file_path: &str) -> bool {
    if subproject_path.is_empty() {
        return true;
    }
    match file_path.strip_prefix(subproject_path) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn component_count(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}

#[must_use]
pub fn normalize_root(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn detects_nested_cargo_subproject() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[workspace]").unwrap();
        fs::create_dir_all(dir.path().join("crates/foo")).unwrap();
        fs::write(dir.path().join("crates/foo/Cargo.toml"), "[package]\nname=\"foo\"").unwrap();

        let found = detect_subprojects(dir.path()).unwrap();
        assert!(found.iter().any(|s| s.path == "crates/foo" && s.marker_kind == "cargo"));
        assert!(found.iter().any(|s| s.path.is_empty()));
    }

    #[test]
    fn skips_excluded_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/some-pkg")).unwrap();
        fs::write(dir.path().join("node_modules/some-pkg/package.json"), "{}").unwrap();

        let found = detect_subprojects(dir.path()).unwrap();
        assert!(!found.iter().any(|s| s.path.contains("node_modules")));
    }

    #[test]
    fn containment_respects_component_boundaries() {
        let subprojects = vec![Subproject::new("src/app".to_string(), "node", 70)];
        assert!(containing_subproject("src/app/main.js", &subprojects).is_some());
        assert!(containing_subproject("src/appendix/main.js", &subprojects).is_none());
    }

    #[test]
    fn deepest_match_wins_over_root() {
        let subprojects = vec![
            Subproject::new(String::new(), "root", 0),
            Subproject::new("crates/foo".to_string(), "cargo", 90),
        ];
        let owner = containing_subproject("crates/foo/src/lib.rs", &subprojects).unwrap();
        assert_eq!(owner.path, "crates/foo");
    }
}
