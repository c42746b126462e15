use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Loaded from `<project_root>/.pommel/config.yaml` (§2 Configuration).
/// Every field has a sensible default, so a project with no config file
/// at all still starts up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PommelConfig {
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub indexer: IndexerSettings,
    pub watcher: WatcherSettings,
    pub server: ServerSettings,
}

impl Default for PommelConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            indexer: IndexerSettings::default(),
            watcher: WatcherSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    /// Never read from the YAML file directly (§2: "secrets only ever
    /// come from the environment"); populated by
    /// [`PommelConfig::apply_env_overrides`].
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub dense_weight: f32,
    pub lexical_weight: f32,
    pub rrf_k: f32,
    /// `"heuristic"`, `"remote"`, or `"remote-then-heuristic"` (§4.4).
    pub reranker: String,
    pub remote_reranker_url: Option<String>,
    /// Used when a request omits `limit` or sends `0` (§4.7 step 2, §8).
    pub default_limit: usize,
    /// Used when a request omits `levels` (§4.7 step 2).
    pub default_levels: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dense_weight: 0.6,
            lexical_weight: 0.4,
            rrf_k: 60.0,
            reranker: "heuristic".to_string(),
            remote_reranker_url: None,
            default_limit: 10,
            default_levels: vec!["method".to_string(), "class".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
    pub chunk_concurrency: usize,
    pub embed_concurrency: usize,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            chunk_concurrency: 8,
            embed_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    pub debounce_ms: u64,
    pub max_batch_wait_ms: u64,
    pub queue_capacity: usize,
    pub drop_oldest: bool,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 750,
            max_batch_wait_ms: 3_000,
            queue_capacity: 64,
            drop_oldest: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: 4848 }
    }
}

impl PommelConfig {
    /// Load `<project_root>/.pommel/config.yaml` if present, falling
    /// back to defaults, then layer in environment-variable overrides.
    pub fn load(project_root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = config_path(project_root.as_ref());
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&raw)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if self.embedding.provider == "openai" {
                self.embedding.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("VOYAGE_API_KEY") {
            if self.embedding.provider == "voyage" {
                self.embedding.api_key = Some(key);
            }
        }
    }
}

#[must_use]
pub fn config_path(project_root: &Path) -> PathBuf {
    pommel_dir(project_root).join("config.yaml")
}

#[must_use]
pub fn pommel_dir(project_root: &Path) -> PathBuf {
    project_root.join(".pommel")
}

#[must_use]
pub fn db_path(project_root: &Path) -> PathBuf {
    pommel_dir(project_root).join("pommel.db")
}

#[must_use]
pub fn pid_path(project_root: &Path) -> PathBuf {
    pommel_dir(project_root).join("pommeld.pid")
}

#[must_use]
pub fn logs_dir(project_root: &Path) -> PathBuf {
    pommel_dir(project_root).join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = PommelConfig::load(dir.path()).unwrap();
        assert_eq!(config.server.port, 4848);
        assert_eq!(config.embedding.provider, "ollama");
    }

    #[test]
    fn loads_overrides_from_yaml() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(pommel_dir(dir.path())).unwrap();
        std::fs::write(
            config_path(dir.path()),
            "server:\n  port: 9999\nembedding:\n  provider: openai\n  model: text-embedding-3-small\n",
        )
        .unwrap();

        let config = PommelConfig::load(dir.path()).unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.embedding.provider, "openai");
    }

    #[test]
    fn api_key_is_never_read_from_yaml() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(pommel_dir(dir.path())).unwrap();
        std::fs::write(
            config_path(dir.path()),
            "embedding:\n  api_key: should-be-ignored\n",
        )
        .unwrap();
        let config = PommelConfig::load(dir.path()).unwrap();
        assert!(config.embedding.api_key.is_none());
    }
}
