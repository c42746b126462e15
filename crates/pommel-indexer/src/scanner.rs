use crate::error::Result;
use ignore::WalkBuilder;
use pommel_subproject::is_excluded_dir;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A file discovered by a scan, with enough metadata to decide whether
/// it needs re-chunking (§4.5 mtime-diff change detection).
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub mtime_ms: i64,
    pub size_bytes: i64,
}

/// Walk `root`, honoring `.pommelignore` (via `ignore`'s gitignore-style
/// matching) and the subproject crate's excluded directory names, and
/// return every regular file found. Symlinks are not followed, to avoid
/// indexing the same content twice or chasing a cycle.
pub fn scan(root: impl AsRef<Path>) -> Result<Vec<ScannedFile>> {
    let root = root.as_ref();
    let mut walker = WalkBuilder::new(root);
    walker
        .hidden(false)
        .follow_links(false)
        .add_custom_ignore_filename(".pommelignore")
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| entry.file_type().map(|t| t.is_file()).unwrap_or(false) || !is_excluded_dir(name))
                .unwrap_or(true)
        });

    let mut files = Vec::new();
    for entry in walker.build().filter_map(std::result::Result::ok) {
        let Some(file_type) = entry.file_type() else { continue };
        if !file_type.is_file() {
            continue;
        }
        let metadata = entry.metadata().map_err(|e| crate::error::IndexerError::Other(e.to_string()))?;
        let mtime_ms = metadata
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let relative_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        files.push(ScannedFile {
            path: entry.path().to_path_buf(),
            relative_path,
            mtime_ms,
            size_bytes: metadata.len() as i64,
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scans_regular_files_and_skips_excluded_dirs() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/pkg.js"), "ignored").unwrap();

        let files = scan(dir.path()).unwrap();
        assert!(files.iter().any(|f| f.relative_path == "main.rs"));
        assert!(!files.iter().any(|f| f.relative_path.contains("node_modules")));
    }

    #[test]
    fn respects_pommelignore() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".pommelignore"), "secret.rs\n").unwrap();
        fs::write(dir.path().join("secret.rs"), "fn s() {}").unwrap();
        fs::write(dir.path().join("visible.rs"), "fn v() {}").unwrap();

        let files = scan(dir.path()).unwrap();
        assert!(files.iter().any(|f| f.relative_path == "visible.rs"));
        assert!(!files.iter().any(|f| f.relative_path == "secret.rs"));
    }
}
