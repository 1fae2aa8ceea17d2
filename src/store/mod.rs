//! Document store abstraction: connection, server-side cursor, backends.
//!
//! A [`Connector`] opens a [`DocumentStore`] for one database; the store runs
//! a [`QueryFilter`] against a collection and hands back a
//! [`DocumentCursor`]. Cursors and stores release their resources on `close`
//! and again, idempotently, on drop.

pub mod import;
pub mod memory;
pub mod sqlite;

pub use import::*;
pub use memory::*;
pub use sqlite::*;

use serde_json::Value;

use crate::error::{CursorError, StoreError};
use crate::filter::QueryFilter;

/// Number of documents a cursor pulls from the store per round trip
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// One matching document as stored, before decoding
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Zero-based arrival index within the cursor
    pub position: usize,
    pub body: Value,
}

/// Lazy, finite, non-restartable stream of raw documents
pub trait DocumentCursor {
    /// Whether another document is available; may block on a round trip
    fn has_next(&mut self) -> Result<bool, CursorError>;

    /// Next document, or [`CursorError::Exhausted`] once the stream is done
    fn next_document(&mut self) -> Result<RawDocument, CursorError>;

    /// Documents delivered so far
    fn position(&self) -> usize;

    /// Release server-side state. Further calls return [`CursorError::Closed`].
    fn close(&mut self);
}

/// An open connection to one database
pub trait DocumentStore {
    /// Round trip to confirm the connection is usable
    fn ping(&self) -> Result<(), StoreError>;

    /// Run `filter` against `collection`, opening a cursor over the matches
    fn find<'s>(
        &'s self,
        collection: &str,
        filter: &QueryFilter,
        batch_size: usize,
    ) -> Result<Box<dyn DocumentCursor + 's>, StoreError>;

    fn close(&mut self);
}

/// Opens stores against a configured endpoint
pub trait Connector {
    type Store: DocumentStore;

    /// Human-readable endpoint for error reports
    fn endpoint(&self) -> String;

    fn connect(&self, database: &str) -> Result<Self::Store, StoreError>;
}

/// Collection names become SQL identifiers; keep them boring
pub fn validate_collection_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 120
        && !name.to_ascii_lowercase().starts_with("sqlite_")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}
