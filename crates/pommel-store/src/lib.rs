//! Durable, transactional storage for chunks, their embeddings, and the
//! full-text index search reads from.
//!
//! Backed by a single SQLite database per project (`.pommel/pommel.db`).
//! Chunk writes and their FTS5 mirror are kept in sync with triggers so a
//! reader never observes a chunk without its full-text entry or vice versa
//! (see DESIGN.md's Open Question #3).

mod error;
mod schema;
mod store;
mod vector;

pub use error::{Result, StoreError};
pub use schema::SCHEMA_VERSION;
pub use store::{FileRecord, ScoredChunkId, SearchFilters, Store, StoreStats, SubprojectRecord};
pub use vector::{cosine_similarity, pack_f32, unpack_f32};
