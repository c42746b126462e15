use std::path::Path;

/// Language tag attached to a [`crate::Chunk`], and the knob that selects
/// which structural patterns [`crate::Chunker`] looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    Python,
    Go,
    JavaScript,
    TypeScript,
    Java,
    C,
    Cpp,
    CSharp,
    Ruby,
    Markdown,
    Yaml,
    Json,
    Config,
    Unknown,
}

impl Language {
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Self::Rust,
            "py" | "pyw" => Self::Python,
            "go" => Self::Go,
            "js" | "mjs" | "cjs" | "jsx" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "java" => Self::Java,
            "c" | "h" => Self::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Self::Cpp,
            "cs" => Self::CSharp,
            "rb" => Self::Ruby,
            "md" | "mdx" | "rst" | "adoc" => Self::Markdown,
            "yaml" | "yml" => Self::Yaml,
            "json" => Self::Json,
            "toml" | "ini" | "cfg" | "conf" | "properties" | "env" => Self::Config,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::Go => "go",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Ruby => "ruby",
            Self::Markdown => "markdown",
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Config => "config",
            Self::Unknown => "unknown",
        }
    }

    /// Languages whose block boundaries are `{ ... }` delimited, so extents
    /// can be found by brace balancing rather than indentation.
    #[must_use]
    pub const fn uses_braces(self) -> bool {
        matches!(
            self,
            Self::Rust
                | Self::Go
                | Self::JavaScript
                | Self::TypeScript
                | Self::Java
                | Self::C
                | Self::Cpp
                | Self::CSharp
        )
    }

    /// Languages with no sub-file structure we attempt to parse; these fall
    /// back to a single file-level chunk per §4.2.
    #[must_use]
    pub const fn structured(self) -> bool {
        matches!(
            self,
            Self::Rust
                | Self::Python
                | Self::Go
                | Self::JavaScript
                | Self::TypeScript
                | Self::Java
                | Self::C
                | Self::Cpp
                | Self::CSharp
                | Self::Ruby
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_extensions() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("PY"), Language::Python);
        assert_eq!(Language::from_extension("unknownext"), Language::Unknown);
    }

    #[test]
    fn brace_languages_exclude_python() {
        assert!(Language::Rust.uses_braces());
        assert!(!Language::Python.uses_braces());
    }
}
