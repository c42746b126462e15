use serde::{Deserialize, Serialize};

/// The indexer's lifecycle state (§4.5). `FullReindex` transitions back
/// to `Scanning` and invalidates every cached file mtime so the next
/// scan treats the whole tree as changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerState {
    Idle,
    Scanning,
    Embedding,
    Persisting,
}

impl IndexerState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Embedding => "embedding",
            Self::Persisting => "persisting",
        }
    }
}

impl std::fmt::Display for IndexerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
