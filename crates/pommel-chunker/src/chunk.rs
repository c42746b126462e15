use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::SystemTime;

/// Chunk granularity, ordered coarsest to finest (§3 Data model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    File,
    Class,
    Section,
    Method,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Class => "class",
            Self::Section => "section",
            Self::Method => "method",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "class" => Some(Self::Class),
            "section" => Some(Self::Section),
            "method" => Some(Self::Method),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic unit of source code with a stable identity (§3 Data model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub level: Level,
    pub language: Option<String>,
    pub name: Option<String>,
    pub signature: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub parent_id: Option<String>,
    pub subproject_id: Option<String>,
    pub subproject_path: Option<String>,
    pub last_modified: u64,
}

impl Chunk {
    /// Build a chunk, deriving `id` and `content_hash` as a 16-byte
    /// (128-bit) SHA-256 prefix, lowercase hex.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        file_path: String,
        level: Level,
        start_line: usize,
        end_line: usize,
        content: String,
        language: Option<String>,
        name: Option<String>,
        signature: Option<String>,
        last_modified: u64,
    ) -> Self {
        let id = chunk_id(&file_path, level, start_line, end_line);
        let content_hash = content_hash(&content);
        Self {
            id,
            file_path,
            start_line,
            end_line,
            level,
            language,
            name,
            signature,
            content,
            content_hash,
            parent_id: None,
            subproject_id: None,
            subproject_path: None,
            last_modified,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Whether this chunk's line range strictly contains `other`'s, the
    /// invariant a `parent_id` reference must satisfy (§3).
    #[must_use]
    pub fn strictly_contains(&self, other: &Chunk) -> bool {
        self.file_path == other.file_path
            && self.start_line <= other.start_line
            && self.end_line >= other.end_line
            && (self.start_line, self.end_line) != (other.start_line, other.end_line)
    }
}

/// Truncated SHA-256 (first 16 bytes, 32 hex chars) over `(path, level,
/// start, end)`. Two chunks with identical tuples always get the same id,
/// regardless of what else in the file changed.
#[must_use]
pub fn chunk_id(file_path: &str, level: Level, start_line: usize, end_line: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update(b"\0");
    hasher.update(level.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(start_line.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(end_line.to_string().as_bytes());
    let digest = hasher.finalize();
    hex16(&digest)
}

/// Truncated SHA-256 over the exact chunk content.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    hex16(&digest)
}

fn hex16(digest: &[u8]) -> String {
    digest[..16].iter().map(|b| format!("{b:02x}")).collect()
}

/// Normalize a filesystem path to the project-relative, forward-slash form
/// the Store persists (§9 Design notes: "never store raw OS-native paths").
#[must_use]
pub fn normalize_path(path: &std::path::Path) -> String {
    let mut normalized = path.to_string_lossy().to_string();
    if normalized.contains('\\') {
        normalized = normalized.replace('\\', "/");
    }
    normalized
}

#[must_use]
pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_for_identical_tuples() {
        let a = chunk_id("a.rs", Level::Method, 10, 20);
        let b = chunk_id("a.rs", Level::Method, 10, 20);
        assert_eq!(a, b);
    }

    #[test]
    fn id_changes_with_any_component() {
        let base = chunk_id("a.rs", Level::Method, 10, 20);
        assert_ne!(base, chunk_id("b.rs", Level::Method, 10, 20));
        assert_ne!(base, chunk_id("a.rs", Level::Class, 10, 20));
        assert_ne!(base, chunk_id("a.rs", Level::Method, 11, 20));
        assert_ne!(base, chunk_id("a.rs", Level::Method, 10, 21));
    }

    #[test]
    fn content_hash_changes_iff_content_changes() {
        let h1 = content_hash("fn a() {}");
        let h2 = content_hash("fn a() {}");
        let h3 = content_hash("fn b() {}");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }

    #[test]
    fn strictly_contains_requires_different_range() {
        let outer = Chunk::new(
            "a.rs".into(),
            Level::Class,
            1,
            50,
            "struct A { .. }".into(),
            None,
            Some("A".into()),
            None,
            0,
        );
        let inner = Chunk::new(
            "a.rs".into(),
            Level::Method,
            10,
            20,
            "fn m() {}".into(),
            None,
            Some("m".into()),
            None,
            0,
        );
        assert!(outer.strictly_contains(&inner));
        assert!(!inner.strictly_contains(&outer));
        assert!(!outer.strictly_contains(&outer.clone()));
    }
}
