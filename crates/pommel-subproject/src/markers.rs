/// A marker file that roots a subproject, with a priority used to break
/// ties when a directory carries more than one marker (§4.5: e.g. a
/// directory with both `Cargo.toml` and `package.json` picks the higher
/// priority one as its primary kind). Listed highest priority first.
pub const MARKERS: &[(&str, &str, i64)] = &[
    ("go.mod", "go", 100),
    ("Cargo.toml", "cargo", 90),
    ("pyproject.toml", "python", 80),
    ("package.json", "node", 70),
];

/// Suffix-matched markers (for patterns like `*.sln`/`*.csproj` that
/// don't have a fixed filename).
pub const MARKER_SUFFIXES: &[(&str, &str, i64)] = &[(".sln", "dotnet-solution", 95), (".csproj", "dotnet-project", 60)];

/// Directory names never descended into while scanning for subprojects
/// or files to chunk (§4.5 / §4.2 "excluded patterns").
pub const EXCLUDED_DIR_NAMES: &[&str] = &[
    "node_modules",
    "vendor",
    "target",
    ".git",
    ".hg",
    ".svn",
    ".pommel",
    "dist",
    "build",
    "__pycache__",
];

#[must_use]
pub fn is_excluded_dir(name: &str) -> bool {
    EXCLUDED_DIR_NAMES.contains(&name) || name.starts_with('.')
}

/// Find the marker kind and priority for a directory entry's filename, if
/// any. Returns the highest-priority match when a name matches more than
/// one rule (cannot happen with the current table, but keeps the
/// function correct if it grows).
#[must_use]
pub fn marker_for_filename(name: &str) -> Option<(&'static str, i64)> {
    let mut best: Option<(&'static str, i64)> = None;
    for (marker_name, kind, priority) in MARKERS {
        if *marker_name == name {
            if best.map(|(_, p)| *priority > p).unwrap_or(true) {
                best = Some((kind, *priority));
            }
        }
    }
    for (suffix, kind, priority) in MARKER_SUFFIXES {
        if name.ends_with(suffix) {
            if best.map(|(_, p)| *priority > p).unwrap_or(true) {
                best = Some((kind, *priority));
            }
        }
    }
    best
}
