use crate::chunk::{normalize_path, Chunk, Level};
use crate::error::Result;
use crate::language::Language;
use regex::Regex;
use std::path::Path;

/// A file as read from disk, the unit [`Chunker`] consumes (§4.2).
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
    pub language: Language,
    pub last_modified: u64,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl AsRef<Path>, content: String, last_modified: u64) -> Self {
        let path = normalize_path(path.as_ref());
        let language = Language::from_path(&path);
        Self {
            path,
            content,
            language,
            last_modified,
        }
    }
}

/// Maximum number of source lines a Section chunk may span before it is
/// split, keeping a dense run of top-level items from swallowing a whole
/// file (§4.2 "chunks stay embeddable-sized").
const MAX_SECTION_LINES: usize = 120;

/// Extracts [`Chunk`]s at file/class/section/method granularity from a
/// [`SourceFile`]. Pure and allocation-only: no filesystem or network
/// access, so it can run inside the indexer's CPU-bound worker pool
/// without blocking on I/O.
#[derive(Debug, Default, Clone)]
pub struct Chunker {
    class_pattern: Option<Regex>,
    method_pattern: Option<Regex>,
}

impl Chunker {
    /// Build a chunker for brace-delimited languages. Regexes are compiled
    /// once here rather than per-call, matching the indexer's lifetime
    /// (one `Chunker` is shared across the whole scan).
    pub fn new() -> Result<Self> {
        Ok(Self {
            class_pattern: Some(Regex::new(
                r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:export\s+)?(?:default\s+)?(?:abstract\s+)?(?:class|struct|interface|enum|trait|impl)\b[^\n{]*\{",
            )?),
            method_pattern: Some(Regex::new(
                r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?(?:export\s+)?(?:async\s+)?(?:static\s+)?(?:public\s+|private\s+|protected\s+)?(?:fn|func|function|def)\s+([A-Za-z_][A-Za-z0-9_]*)\s*[(<][^\n{;]*\{",
            )?),
        })
    }

    /// Extract every chunk level this file supports. Always yields at
    /// least the file-level chunk; never panics on malformed input
    /// (unterminated braces just stop the scan at end of file).
    #[must_use]
    pub fn chunk(&self, source: &SourceFile) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let file_chunk = self.file_chunk(source);
        let file_id = file_chunk.id.clone();
        chunks.push(file_chunk);

        if !source.language.structured() || source.content.trim().is_empty() {
            return chunks;
        }

        if source.language.uses_braces() {
            self.chunk_braces(source, &file_id, &mut chunks);
        } else {
            self.chunk_blocks(source, &file_id, &mut chunks);
        }

        chunks
    }

    fn file_chunk(&self, source: &SourceFile) -> Chunk {
        let line_count = source.content.lines().count().max(1);
        Chunk::new(
            source.path.clone(),
            Level::File,
            1,
            line_count,
            source.content.clone(),
            Some(source.language.tag().to_string()),
            Some(file_name(&source.path)),
            None,
            source.last_modified,
        )
    }

    fn chunk_braces(&self, source: &SourceFile, file_id: &str, out: &mut Vec<Chunk>) {
        let lines: Vec<&str> = source.content.lines().collect();
        let class_re = self.class_pattern.as_ref().expect("brace chunker built with class_pattern");
        let method_re = self.method_pattern.as_ref().expect("brace chunker built with method_pattern");

        let mut claimed = vec![false; lines.len()];
        let mut classes = Vec::new();

        for m in class_re.find_iter(&source.content) {
            let start_line = line_of_byte(&source.content, m.start());
            let Some(end_line) = find_matching_brace_line(&lines, start_line) else {
                continue;
            };
            if claimed[start_line..=end_line].iter().any(|c| *c) {
                continue;
            }
            for slot in &mut claimed[start_line..=end_line] {
                *slot = true;
            }
            let name = extract_name(lines[start_line]);
            let content = lines[start_line..=end_line].join("\n");
            let class_chunk = Chunk::new(
                source.path.clone(),
                Level::Class,
                start_line + 1,
                end_line + 1,
                content,
                Some(source.language.tag().to_string()),
                name,
                Some(lines[start_line].trim().to_string()),
                source.last_modified,
            )
            .with_parent(Some(file_id.to_string()));

            self.chunk_methods(source, &lines, start_line, end_line, method_re, &class_chunk.id, &mut claimed, out);
            classes.push(class_chunk);
        }
        out.extend(classes);

        // Methods at top level (not inside any class/impl block) still get
        // extracted as their own Method chunks, parented to the file.
        self.chunk_methods(source, &lines, 0, lines.len().saturating_sub(1), method_re, file_id, &mut claimed, out);

        section_chunks_brace(source, &lines, &claimed, file_id, out);
    }

    #[allow(clippy::too_many_arguments)]
    fn chunk_methods(
        &self,
        source: &SourceFile,
        lines: &[&str],
        range_start: usize,
        range_end: usize,
        method_re: &Regex,
        parent_id: &str,
        claimed: &mut [bool],
        out: &mut Vec<Chunk>,
    ) {
        if range_start > range_end || lines.is_empty() {
            return;
        }
        let window = lines[range_start..=range_end].join("\n");
        for m in method_re.find_iter(&window) {
            let local_start = line_of_byte(&window, m.start());
            let start_line = range_start + local_start;
            let Some(end_line) = find_matching_brace_line(lines, start_line) else {
                continue;
            };
            if end_line > range_end {
                continue;
            }
            if claimed[start_line..=end_line].iter().any(|c| *c) {
                continue;
            }
            for slot in &mut claimed[start_line..=end_line] {
                *slot = true;
            }
            let name = m
                .as_str()
                .split(|c: char| c == '(' || c == '<')
                .next()
                .and_then(|s| s.split_whitespace().last())
                .map(str::to_string);
            let content = lines[start_line..=end_line].join("\n");
            out.push(
                Chunk::new(
                    source.path.clone(),
                    Level::Method,
                    start_line + 1,
                    end_line + 1,
                    content,
                    Some(source.language.tag().to_string()),
                    name,
                    Some(lines[start_line].trim().to_string()),
                    source.last_modified,
                )
                .with_parent(Some(parent_id.to_string())),
            );
        }
    }

    fn chunk_blocks(&self, source: &SourceFile, file_id: &str, out: &mut Vec<Chunk>) {
        let lines: Vec<&str> = source.content.lines().collect();
        let is_markdown = matches!(source.language, Language::Markdown);
        let mut block_start: Option<usize> = None;

        let mut flush = |start: usize, end: usize, out: &mut Vec<Chunk>| {
            if end < start {
                return;
            }
            let content = lines[start..=end].join("\n");
            if content.trim().is_empty() {
                return;
            }
            out.push(
                Chunk::new(
                    source.path.clone(),
                    Level::Section,
                    start + 1,
                    end + 1,
                    content,
                    Some(source.language.tag().to_string()),
                    is_markdown.then(|| lines[start].trim_start_matches('#').trim().to_string()).flatten(),
                    None,
                    source.last_modified,
                )
                .with_parent(Some(file_id.to_string())),
            );
        };

        for (idx, line) in lines.iter().enumerate() {
            let is_boundary = if is_markdown {
                line.trim_start().starts_with('#')
            } else {
                line.trim().is_empty()
            };

            if is_boundary {
                if let Some(start) = block_start.take() {
                    let end = if is_markdown { idx.saturating_sub(1) } else { idx.saturating_sub(1) };
                    flush(start, end, out);
                }
                if is_markdown && line.trim_start().starts_with('#') {
                    block_start = Some(idx);
                }
            } else if block_start.is_none() {
                block_start = Some(idx);
            }
        }
        if let Some(start) = block_start {
            flush(start, lines.len().saturating_sub(1), out);
        }
    }
}

/// Section-level chunks for brace languages: contiguous runs of
/// unclaimed (i.e. not already covered by a Class/Method chunk) lines,
/// split at blank-line boundaries and capped at [`MAX_SECTION_LINES`].
/// This is deliberately conservative — free functions clustered between
/// two unrelated classes form one Section rather than one-per-function,
/// since Method already covers the fine grain.
fn section_chunks_brace(source: &SourceFile, lines: &[&str], claimed: &[bool], file_id: &str, out: &mut Vec<Chunk>) {
    let mut run_start: Option<usize> = None;
    let mut blank_run = 0usize;

    let mut flush = |start: usize, end: usize, out: &mut Vec<Chunk>| {
        if end < start {
            return;
        }
        let trimmed_end = (start + MAX_SECTION_LINES.min(end - start + 1) - 1).min(end);
        let content = lines[start..=trimmed_end].join("\n");
        if content.trim().is_empty() {
            return;
        }
        out.push(
            Chunk::new(
                source.path.clone(),
                Level::Section,
                start + 1,
                trimmed_end + 1,
                content,
                Some(source.language.tag().to_string()),
                None,
                None,
                source.last_modified,
            )
            .with_parent(Some(file_id.to_string())),
        );
    };

    for (idx, claimed_line) in claimed.iter().enumerate() {
        if *claimed_line {
            if let Some(start) = run_start.take() {
                flush(start, idx.saturating_sub(1), out);
            }
            blank_run = 0;
            continue;
        }
        if lines[idx].trim().is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                if let Some(start) = run_start.take() {
                    flush(start, idx.saturating_sub(blank_run), out);
                }
            }
            continue;
        }
        blank_run = 0;
        if run_start.is_none() {
            run_start = Some(idx);
        }
    }
    if let Some(start) = run_start {
        flush(start, lines.len().saturating_sub(1), out);
    }
}

fn line_of_byte(s: &str, byte_idx: usize) -> usize {
    s.as_bytes()[..byte_idx.min(s.len())].iter().filter(|b| **b == b'\n').count()
}

/// Scan forward from `start_line` for the `{` that opens the block and
/// return the line of its matching `}`. Tolerant of braces inside string
/// and char literals being miscounted (accepted imprecision — §4.2 notes
/// chunk boundaries are best-effort, not a parser).
fn find_matching_brace_line(lines: &[&str], start_line: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut opened = false;
    for (offset, line) in lines.get(start_line..)?.iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return Some(start_line + offset);
        }
    }
    None
}

fn extract_name(header_line: &str) -> Option<String> {
    let re = Regex::new(r"(?:class|struct|interface|enum|trait|impl(?:<[^>]*>)?)\s+(?:for\s+)?([A-Za-z_][A-Za-z0-9_]*)").ok()?;
    re.captures(header_line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rust_file(content: &str) -> SourceFile {
        SourceFile::new("src/lib.rs", content.to_string(), 1_700_000_000)
    }

    #[test]
    fn always_emits_a_file_chunk() {
        let chunker = Chunker::new().unwrap();
        let chunks = chunker.chunk(&rust_file("fn main() {}\n"));
        assert!(chunks.iter().any(|c| c.level == Level::File));
    }

    #[test]
    fn extracts_struct_and_method_chunks() {
        let chunker = Chunker::new().unwrap();
        let src = rust_file(
            r#"
struct Widget {
    name: String,
}

impl Widget {
    fn new(name: String) -> Self {
        Self { name }
    }

    fn greet(&self) -> String {
        format!("hi {}", self.name)
    }
}
"#,
        );
        let chunks = chunker.chunk(&src);
        let classes: Vec<_> = chunks.iter().filter(|c| c.level == Level::Class).collect();
        let methods: Vec<_> = chunks.iter().filter(|c| c.level == Level::Method).collect();
        assert_eq!(classes.len(), 2, "struct Widget + impl Widget");
        assert_eq!(methods.len(), 2, "new + greet");
        assert!(methods.iter().any(|m| m.name.as_deref() == Some("new")));
        assert!(methods.iter().any(|m| m.name.as_deref() == Some("greet")));
        for m in &methods {
            assert!(m.parent_id.is_some());
        }
    }

    #[test]
    fn groups_free_functions_into_a_section() {
        let chunker = Chunker::new().unwrap();
        let src = rust_file(
            r#"
fn helper_one() {
    1;
}

fn helper_two() {
    2;
}
"#,
        );
        let chunks = chunker.chunk(&src);
        assert!(chunks.iter().any(|c| c.level == Level::Section));
        assert_eq!(chunks.iter().filter(|c| c.level == Level::Method).count(), 2);
    }

    #[test]
    fn unstructured_language_yields_file_only() {
        let chunker = Chunker::new().unwrap();
        let src = SourceFile::new("data/blob.bin", "xyz".to_string(), 0);
        let chunks = chunker.chunk(&src);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].level, Level::File);
    }

    #[test]
    fn markdown_sections_split_on_headers() {
        let chunker = Chunker::new().unwrap();
        let src = SourceFile::new(
            "README.md",
            "# Intro\nhello\n\n# Usage\nrun it\n".to_string(),
            0,
        );
        let chunks = chunker.chunk(&src);
        let sections: Vec<_> = chunks.iter().filter(|c| c.level == Level::Section).collect();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name.as_deref(), Some("Intro"));
        assert_eq!(sections[1].name.as_deref(), Some("Usage"));
    }

    #[test]
    fn unterminated_brace_does_not_panic() {
        let chunker = Chunker::new().unwrap();
        let src = rust_file("struct Broken {\n    field: u8,\n");
        let _ = chunker.chunk(&src);
    }
}
