//! Turns source files into the [`Chunk`]s the rest of Pommel indexes and
//! searches over.
//!
//! ## Pipeline
//!
//! ```text
//! SourceFile -> Chunker::chunk() -> Vec<Chunk>
//!                  |
//!                  +-- File    (always, whole-file fallback)
//!                  +-- Class   (struct/class/impl/interface/trait blocks)
//!                  +-- Section (sibling top-level items not in a class)
//!                  +-- Method  (fn/func/function/def blocks)
//! ```
//!
//! Extraction is regex + brace-balancing, not a language parser: good
//! enough to recover stable, embeddable units without carrying a
//! per-language grammar dependency (see DESIGN.md for why tree-sitter
//! was dropped).

mod chunk;
mod chunker;
mod error;
mod language;

pub use chunk::{chunk_id, content_hash, normalize_path, unix_secs, Chunk, Level};
pub use chunker::{Chunker, SourceFile};
pub use error::{ChunkerError, Result};
pub use language::Language;
