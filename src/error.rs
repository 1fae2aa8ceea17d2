//! Error types for the extraction pipeline.
//!
//! Fatal errors (`StoreError` during connect or query, `QueryBuildError`,
//! `CursorError`) unwind the whole run and surface as a [`RunError`] with the
//! stage and query that failed. `DecodeError` is per document and only ever
//! lands in the diagnostics of a [`ResultSet`](crate::result::ResultSet).

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::RunState;
use crate::result::ResultSet;
use crate::schema::FieldType;

/// Errors raised by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("endpoint {0:?} does not exist or is not a directory")]
    EndpointNotFound(PathBuf),

    #[error("database {database:?} not found at {path:?}")]
    DatabaseNotFound { database: String, path: PathBuf },

    #[error("invalid collection name {0:?}")]
    InvalidCollection(String),

    #[error("collection {0:?} does not exist")]
    UnknownCollection(String),

    #[error("server did not answer ping: {0}")]
    Ping(String),

    #[error("store connection is closed")]
    Closed,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors raised while building a [`QueryFilter`](crate::filter::QueryFilter).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryBuildError {
    #[error("unknown filter field: {0}")]
    UnknownField(String),

    #[error("field {field} expects {expected} values, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("set-membership on {0} needs at least one value")]
    EmptySet(String),
}

/// End-of-stream and failure signals of a [`DocumentCursor`](crate::store::DocumentCursor).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CursorError {
    /// Every matching document has been delivered.
    #[error("cursor exhausted")]
    Exhausted,

    /// The stream broke before it was exhausted.
    #[error("cursor interrupted after {position} documents: {reason}")]
    Interrupted { position: usize, reason: String },

    #[error("cursor already closed")]
    Closed,
}

/// Why a single field could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeErrorKind {
    #[error("is missing")]
    Missing,

    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("has invalid number {0:?}")]
    InvalidNumber(String),

    #[error("is out of range: {0}")]
    OutOfRange(String),

    #[error("has invalid object id {0:?}")]
    InvalidObjectId(String),

    #[error("has invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("has unrecognized value {0:?}")]
    UnknownVariant(String),
}

/// A document that could not be mapped onto the typed model.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "document {}: field `{field}` {kind}",
    .document_id.as_deref().unwrap_or("<unidentified>")
)]
pub struct DecodeError {
    /// `id64` (or `_id`) of the offending document, when it could be read.
    pub document_id: Option<String>,
    /// Dotted path of the field, e.g. `bodies[2].rings[0].mass`.
    pub field: String,
    pub kind: DecodeErrorKind,
}

/// Fatal failure of an extraction run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("connection to {endpoint} failed")]
    Connection {
        endpoint: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    QueryBuild(#[from] QueryBuildError),

    #[error("query {query} on collection {collection} was rejected")]
    QueryExecution {
        collection: String,
        query: String,
        #[source]
        source: StoreError,
    },

    /// Carries the documents decoded before the break when the run asked
    /// for best-effort output.
    #[error("cursor for query {query} failed after {received} documents")]
    Cursor {
        query: String,
        received: usize,
        partial: Option<ResultSet>,
        #[source]
        source: CursorError,
    },

    #[error("run cancelled while {stage}")]
    Cancelled {
        stage: RunState,
        partial: Option<ResultSet>,
    },

    #[error("run already finished in state {0}")]
    Finished(RunState),
}

impl RunError {
    /// Partial results attached to a best-effort failure, if any.
    pub fn partial(&self) -> Option<&ResultSet> {
        match self {
            RunError::Cursor { partial, .. } | RunError::Cancelled { partial, .. } => {
                partial.as_ref()
            }
            _ => None,
        }
    }

    pub fn into_partial(self) -> Option<ResultSet> {
        match self {
            RunError::Cursor { partial, .. } | RunError::Cancelled { partial, .. } => partial,
            _ => None,
        }
    }
}
