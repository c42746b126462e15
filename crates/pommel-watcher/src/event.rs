use pommel_subproject::is_excluded_dir;
use std::path::{Path, PathBuf};

/// A single filesystem change, already relevance-filtered (§4.5 File
/// watcher). A rename is surfaced as the pair `(Deleted, Created)` when
/// the backend (here, any [`notify::EventKind::Modify::Name`] without
/// both halves) can't represent it atomically, per the resolved behavior
/// in §4.5.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FileEvent {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Modified(p) | Self::Deleted(p) => p,
        }
    }
}

/// Directory components and filenames the watcher ignores outright, so a
/// build artifact churn never reaches the debounce layer. Reuses the
/// subproject crate's exclusion list (§4.5 notes these should stay in
/// sync) plus a few watcher-only noise patterns.
#[must_use]
pub fn is_relevant_path(path: &Path) -> bool {
    for component in path.components() {
        if let std::path::Component::Normal(name) = component {
            if let Some(name) = name.to_str() {
                if is_excluded_dir(name) {
                    return false;
                }
            }
        }
    }
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if name == ".pommelignore" || name.ends_with(".swp") || name.ends_with('~') {
            return false;
        }
    }
    true
}
