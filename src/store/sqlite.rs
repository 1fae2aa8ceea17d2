use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rusqlite::functions::{Context, FunctionFlags};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::Value;
use tracing::{debug, warn};

use super::{validate_collection_name, Connector, DocumentCursor, DocumentStore, RawDocument};
use crate::error::{CursorError, StoreError};
use crate::filter::{FilterValue, QueryFilter};
use crate::parser::extended::{parse_f64, parse_i64};
use crate::schema::FieldType;

pub const DATABASE_EXTENSION: &str = "sqlite3";

/// SQL function reading a JSON value as an integer the way the decoder does
const INTEGER_FN: &str = "extended_integer";

/// SQL function reading a JSON value as a float the way the decoder does
const REAL_FN: &str = "extended_real";

/// File holding `database` under `endpoint`
pub fn database_path(endpoint: &Path, database: &str) -> PathBuf {
    endpoint.join(format!("{}.{}", database, DATABASE_EXTENSION))
}

/// Embedded document store: one SQLite file per database under an endpoint
/// directory, one table of JSON documents per collection.
pub struct SqliteConnector {
    endpoint: PathBuf,
}

impl SqliteConnector {
    pub fn new(endpoint: impl Into<PathBuf>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl Connector for SqliteConnector {
    type Store = SqliteStore;

    fn endpoint(&self) -> String {
        self.endpoint.display().to_string()
    }

    fn connect(&self, database: &str) -> Result<SqliteStore, StoreError> {
        if !self.endpoint.is_dir() {
            return Err(StoreError::EndpointNotFound(self.endpoint.clone()));
        }

        let path = database_path(&self.endpoint, database);
        if !path.is_file() {
            return Err(StoreError::DatabaseNotFound {
                database: database.to_string(),
                path,
            });
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        register_functions(&conn)?;
        debug!(path = %path.display(), "Opened document store");

        Ok(SqliteStore {
            conn: Some(conn),
            path,
        })
    }
}

pub struct SqliteStore {
    conn: Option<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    pub fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

impl DocumentStore for SqliteStore {
    fn ping(&self) -> Result<(), StoreError> {
        let one: i64 = self
            .conn()?
            .query_row("SELECT 1", [], |row| row.get(0))
            .map_err(|e| StoreError::Ping(e.to_string()))?;
        if one == 1 {
            Ok(())
        } else {
            Err(StoreError::Ping(format!("unexpected reply {}", one)))
        }
    }

    fn find<'s>(
        &'s self,
        collection: &str,
        filter: &QueryFilter,
        batch_size: usize,
    ) -> Result<Box<dyn DocumentCursor + 's>, StoreError> {
        validate_collection_name(collection)?;
        let conn = self.conn()?;
        if !self.collection_exists(collection)? {
            return Err(StoreError::UnknownCollection(collection.to_string()));
        }

        let (predicate, params) = compile_filter(filter);
        let sql = format!(
            "SELECT seq, doc FROM \"{}\" WHERE seq > ? AND {} ORDER BY seq LIMIT ?",
            collection, predicate
        );
        debug!(%sql, params = params.len(), "Opened cursor");

        let mut cursor = SqliteCursor {
            conn,
            sql,
            params,
            batch_size: batch_size.max(1),
            last_seq: 0,
            buffer: VecDeque::new(),
            delivered: 0,
            state: CursorState::Open,
        };
        // First batch runs here so a rejected query fails the find, not the first pull
        cursor.fetch()?;
        Ok(Box::new(cursor))
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => debug!(path = %self.path.display(), "Closed document store"),
                Err((_, e)) => {
                    warn!(path = %self.path.display(), error = %e, "Failed to close document store cleanly")
                }
            }
        }
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Open,
    /// Last batch fetched; buffer may still hold documents
    Drained,
    Exhausted,
    Closed,
}

/// Keyset-paginated cursor: each round trip fetches the next `batch_size`
/// matches after the last delivered `seq`, in insertion order.
pub struct SqliteCursor<'c> {
    conn: &'c Connection,
    sql: String,
    params: Vec<SqlValue>,
    batch_size: usize,
    last_seq: i64,
    buffer: VecDeque<(i64, String)>,
    delivered: usize,
    state: CursorState,
}

impl SqliteCursor<'_> {
    fn fill(&mut self) -> Result<(), CursorError> {
        if self.state != CursorState::Open || !self.buffer.is_empty() {
            return Ok(());
        }
        self.fetch().map_err(|e| CursorError::Interrupted {
            position: self.delivered,
            reason: e.to_string(),
        })
    }

    /// One round trip: the next `batch_size` matches after `last_seq`
    fn fetch(&mut self) -> rusqlite::Result<()> {
        let conn = self.conn;
        let mut stmt = conn.prepare_cached(&self.sql)?;

        let mut bind = Vec::with_capacity(self.params.len() + 2);
        bind.push(SqlValue::Integer(self.last_seq));
        bind.extend(self.params.iter().cloned());
        bind.push(SqlValue::Integer(self.batch_size as i64));

        let rows = stmt.query_map(params_from_iter(bind.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut fetched = 0;
        for row in rows {
            let (seq, doc) = row?;
            self.last_seq = seq;
            self.buffer.push_back((seq, doc));
            fetched += 1;
        }

        if fetched < self.batch_size {
            self.state = CursorState::Drained;
        }
        Ok(())
    }
}

impl DocumentCursor for SqliteCursor<'_> {
    fn has_next(&mut self) -> Result<bool, CursorError> {
        match self.state {
            CursorState::Closed => return Err(CursorError::Closed),
            CursorState::Exhausted => return Ok(false),
            _ => {}
        }

        self.fill()?;
        if self.buffer.is_empty() {
            self.state = CursorState::Exhausted;
            debug!(delivered = self.delivered, "Cursor exhausted");
            return Ok(false);
        }
        Ok(true)
    }

    fn next_document(&mut self) -> Result<RawDocument, CursorError> {
        if !self.has_next()? {
            return Err(CursorError::Exhausted);
        }

        let Some((seq, text)) = self.buffer.pop_front() else {
            return Err(CursorError::Exhausted);
        };
        let body = serde_json::from_str(&text).map_err(|e| CursorError::Interrupted {
            position: self.delivered,
            reason: format!("stored document seq {} is unreadable: {}", seq, e),
        })?;

        let position = self.delivered;
        self.delivered += 1;
        Ok(RawDocument { position, body })
    }

    fn position(&self) -> usize {
        self.delivered
    }

    fn close(&mut self) {
        if self.state != CursorState::Closed {
            self.buffer.clear();
            self.state = CursorState::Closed;
            debug!(delivered = self.delivered, "Cursor closed");
        }
    }
}

impl Drop for SqliteCursor<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Compile a filter to a SQL predicate over the `doc` column plus its
/// positional parameters.
///
/// Matches what [`QueryFilter::matches`] accepts: array fields fan out over
/// their elements (a scalar in their place counts as one element), and
/// numbers are read through the same extended-JSON rules as the decoder.
pub fn compile_filter(filter: &QueryFilter) -> (String, Vec<SqlValue>) {
    if filter.constraints().is_empty() {
        return ("1".to_string(), Vec::new());
    }

    let mut clauses = Vec::new();
    let mut params = Vec::new();

    for constraint in filter.constraints() {
        let values = constraint.predicate.values();
        let placeholders = vec!["?"; values.len()].join(", ");

        let field = constraint.field;
        let segments: Vec<&str> = field.segments().collect();
        let full_path = format!("'{}'", json_path(&segments));

        let clause = if field.multi {
            let (array, rest) = segments.split_first().map_or(("", &[][..]), |(a, r)| (*a, r));
            let array_path = json_path(&[array]);
            let element_path = if rest.is_empty() {
                "e.fullkey".to_string()
            } else {
                format!("e.fullkey || '{}'", &json_path(rest)[1..])
            };
            // placeholders appear twice
            params.extend(values.iter().map(to_sql));
            params.extend(values.iter().map(to_sql));
            format!(
                "((json_type(doc, '{arr}') = 'array' AND EXISTS (SELECT 1 FROM json_each(doc, '{arr}') AS e \
                 WHERE {element} IN ({ph}))) \
                 OR (json_type(doc, '{arr}') NOT IN ('array', 'null') AND {scalar} IN ({ph})))",
                arr = array_path,
                element = value_expr(&element_path, field.field_type),
                scalar = value_expr(&full_path, field.field_type),
                ph = placeholders,
            )
        } else {
            params.extend(values.iter().map(to_sql));
            format!(
                "{} IN ({})",
                value_expr(&full_path, field.field_type),
                placeholders
            )
        };
        clauses.push(clause);
    }

    (clauses.join(" AND "), params)
}

fn json_path(segments: &[&str]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        path.push('.');
        path.push_str(segment);
    }
    path
}

/// SQL expression reading the value at `path`, itself a SQL expression
fn value_expr(path: &str, field_type: FieldType) -> String {
    match field_type {
        FieldType::Text => format!(
            "(CASE json_type(doc, {p}) WHEN 'text' THEN json_extract(doc, {p}) END)",
            p = path
        ),
        FieldType::Integer => format!("{}(doc -> ({}))", INTEGER_FN, path),
        FieldType::Real => format!("{}(doc -> ({}))", REAL_FN, path),
    }
}

/// Install the numeric readers used by compiled filters
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function(INTEGER_FN, 1, flags, |ctx| {
        Ok(json_arg(ctx)?.and_then(|v| parse_i64(&v).ok()))
    })?;
    conn.create_scalar_function(REAL_FN, 1, flags, |ctx| {
        Ok(json_arg(ctx)?
            .and_then(|v| parse_f64(&v).ok())
            .filter(|f| !f.is_nan()))
    })?;
    Ok(())
}

/// JSON text argument, as produced by the `->` operator
fn json_arg(ctx: &Context<'_>) -> rusqlite::Result<Option<Value>> {
    let text: Option<String> = ctx.get(0)?;
    Ok(text.and_then(|t| serde_json::from_str(&t).ok()))
}

fn to_sql(value: &FilterValue) -> SqlValue {
    match value {
        FilterValue::Text(s) => SqlValue::Text(s.clone()),
        FilterValue::Integer(i) => SqlValue::Integer(*i),
        FilterValue::Real(f) => SqlValue::Real(*f),
    }
}
