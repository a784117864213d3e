//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - uploads(id, repository_id, commit_rev, root, indexer, state, finished_at)
//! - hovers(upload_id, path, range, text)
//! - definitions(upload_id, path, range, target)
//! - refs(upload_id, path, range, target)
//! - monikers(upload_id, path, range, scheme, identifier, kind)
//! - symbol_locations(upload_id, scheme, identifier, table_name, path, range)
//!
//! One database plays both store roles: upload metadata for candidate
//! selection and per-upload bundle data for lookups.

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteIndexStore;
