//! Locates the Pommel project a `pm` invocation applies to, the same
//! way a VCS CLI walks up from the working directory looking for its
//! dotdir, rather than requiring `--root` on every command.

use std::path::{Path, PathBuf};

const POMMEL_DIR: &str = ".pommel";
const DEFAULT_PORT: u16 = 4848;

/// Walk up from `start` looking for a `.pommel` directory. Falls back to
/// the user's home directory only when nothing is found, so a `pm`
/// invoked outside any indexed project still resolves to something.
#[must_use]
pub fn discover_project_root(start: &Path) -> PathBuf {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(POMMEL_DIR).is_dir() {
            return dir;
        }
        if !dir.pop() {
            break;
        }
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Read the daemon's listening port out of `<root>/.pommel/config.yaml`,
/// falling back to the default if the file is missing or doesn't set one.
#[must_use]
pub fn daemon_port(root: &Path) -> u16 {
    let path = root.join(POMMEL_DIR).join("config.yaml");
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return DEFAULT_PORT;
    };
    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(&raw) else {
        return DEFAULT_PORT;
    };
    value
        .get("server")
        .and_then(|s| s.get("port"))
        .and_then(serde_yaml::Value::as_u64)
        .and_then(|p| u16::try_from(p).ok())
        .unwrap_or(DEFAULT_PORT)
}

#[must_use]
pub fn daemon_base_url(root: &Path) -> String {
    format!("http://127.0.0.1:{}", daemon_port(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_pommel_dir_in_an_ancestor() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join(".pommel")).unwrap();
        let nested = project.path().join("src").join("nested");
        std::fs::create_dir_all(&nested).unwrap();

        let found = discover_project_root(&nested);
        assert_eq!(found, project.path());
    }

    #[test]
    fn default_port_when_config_missing() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join(".pommel")).unwrap();
        assert_eq!(daemon_port(project.path()), DEFAULT_PORT);
    }

    #[test]
    fn reads_configured_port() {
        let project = TempDir::new().unwrap();
        std::fs::create_dir_all(project.path().join(".pommel")).unwrap();
        std::fs::write(
            project.path().join(".pommel").join("config.yaml"),
            "server:\n  port: 9123\n",
        )
        .unwrap();
        assert_eq!(daemon_port(project.path()), 9123);
    }
}
