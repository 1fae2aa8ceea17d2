//! Extraction run: connect, query, drain the cursor, decode.
//!
//! A [`Pipeline`] owns its connection and cursor for the whole run and walks
//! a one-way state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Querying -> Iterating -> Closed
//!                                                                  \-> ClosedOnError
//! ```
//!
//! Any fatal error moves the run to `ClosedOnError`. Both closed states are
//! terminal; calling [`Pipeline::run`] again fails with [`RunError::Finished`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{CursorError, RunError};
use crate::filter::QueryFilter;
use crate::parser::decode_system;
use crate::result::{ResultSet, Tagged};
use crate::store::{
    Connector, DocumentCursor, DocumentStore, RawDocument, SqliteConnector, DEFAULT_BATCH_SIZE,
};

/// Lifecycle of one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Disconnected,
    Connecting,
    Connected,
    Querying,
    Iterating,
    Closed,
    ClosedOnError,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Closed | RunState::ClosedOnError)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Disconnected => write!(f, "disconnected"),
            RunState::Connecting => write!(f, "connecting"),
            RunState::Connected => write!(f, "connected"),
            RunState::Querying => write!(f, "querying"),
            RunState::Iterating => write!(f, "iterating"),
            RunState::Closed => write!(f, "closed"),
            RunState::ClosedOnError => write!(f, "closed on error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Decode threads; 0 or 1 decodes on the calling thread
    pub decode_workers: usize,
    /// Documents pulled from the cursor per decode batch
    pub batch_size: usize,
    /// Attach what was decoded so far to cursor and cancellation errors
    pub best_effort: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            decode_workers: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            best_effort: false,
        }
    }
}

/// Cooperative cancellation shared between a run and its controller.
///
/// Clones share the same flag. The run checks it before every pull from
/// the cursor, so a blocked round trip finishes before cancellation is seen.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that trips on its own once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

pub struct Pipeline<C: Connector> {
    connector: C,
    database: String,
    collection: String,
    options: RunOptions,
    state: RunState,
}

impl<C: Connector> Pipeline<C> {
    pub fn new(connector: C, database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            connector,
            database: database.into(),
            collection: collection.into(),
            options: RunOptions::default(),
            state: RunState::Disconnected,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute `filter` and decode every matching document.
    ///
    /// Documents that fail to decode are skipped and reported in
    /// [`ResultSet::diagnostics`]. Connection, query and cursor failures and
    /// cancellation abort the run; the cursor and connection are closed
    /// before the error is returned.
    pub fn run(&mut self, filter: &QueryFilter, cancel: &CancelToken) -> Result<ResultSet, RunError> {
        if self.state != RunState::Disconnected {
            return Err(RunError::Finished(self.state));
        }

        let start = Instant::now();
        let result = self.execute(filter, cancel);

        match &result {
            Ok(results) => {
                self.transition(RunState::Closed);
                info!(
                    collection = %self.collection,
                    systems = results.len(),
                    skipped = results.diagnostics().len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Extraction finished"
                );
            }
            Err(err) => {
                self.transition(RunState::ClosedOnError);
                debug!(error = %err, "Extraction aborted");
            }
        }

        result
    }

    fn execute(&mut self, filter: &QueryFilter, cancel: &CancelToken) -> Result<ResultSet, RunError> {
        self.check_cancelled(cancel)?;
        self.transition(RunState::Connecting);

        let endpoint = self.connector.endpoint();
        let mut store = self
            .connector
            .connect(&self.database)
            .map_err(|source| RunError::Connection {
                endpoint: endpoint.clone(),
                source,
            })?;

        if let Err(source) = store.ping() {
            store.close();
            return Err(RunError::Connection { endpoint, source });
        }
        self.transition(RunState::Connected);

        let result = self.query(&store, filter, cancel);
        store.close();
        result
    }

    fn query(
        &mut self,
        store: &C::Store,
        filter: &QueryFilter,
        cancel: &CancelToken,
    ) -> Result<ResultSet, RunError> {
        self.check_cancelled(cancel)?;
        self.transition(RunState::Querying);

        let query = filter.to_string();
        debug!(collection = %self.collection, %query, "Running query");

        let batch_size = self.options.batch_size.max(1);
        let mut cursor = store
            .find(&self.collection, filter, batch_size)
            .map_err(|source| RunError::QueryExecution {
                collection: self.collection.clone(),
                query: query.clone(),
                source,
            })?;
        self.transition(RunState::Iterating);

        let result = self.drain(cursor.as_mut(), &query, cancel);
        cursor.close();
        result
    }

    fn drain(
        &self,
        cursor: &mut dyn DocumentCursor,
        query: &str,
        cancel: &CancelToken,
    ) -> Result<ResultSet, RunError> {
        let decoder = Decoder::new(self.options.decode_workers);
        let batch_size = self.options.batch_size.max(1);
        let mut results = ResultSet::new();
        let mut pending: Vec<RawDocument> = Vec::with_capacity(batch_size);

        loop {
            if cancel.is_cancelled() {
                let partial = self.partial(&decoder, pending, results);
                return Err(RunError::Cancelled {
                    stage: self.state,
                    partial,
                });
            }

            let pulled = match cursor.has_next() {
                Ok(false) => None,
                Ok(true) => match cursor.next_document() {
                    Ok(doc) => Some(doc),
                    Err(CursorError::Exhausted) => None,
                    Err(source) => {
                        return Err(self.cursor_error(cursor, query, source, &decoder, pending, results))
                    }
                },
                Err(CursorError::Exhausted) => None,
                Err(source) => {
                    return Err(self.cursor_error(cursor, query, source, &decoder, pending, results))
                }
            };

            match pulled {
                Some(doc) => {
                    pending.push(doc);
                    if pending.len() >= batch_size {
                        decode_into(&decoder, std::mem::take(&mut pending), &mut results);
                    }
                }
                None => break,
            }
        }

        decode_into(&decoder, pending, &mut results);
        Ok(results)
    }

    fn cursor_error(
        &self,
        cursor: &dyn DocumentCursor,
        query: &str,
        source: CursorError,
        decoder: &Decoder,
        pending: Vec<RawDocument>,
        results: ResultSet,
    ) -> RunError {
        RunError::Cursor {
            query: query.to_string(),
            received: cursor.position(),
            partial: self.partial(decoder, pending, results),
            source,
        }
    }

    fn partial(
        &self,
        decoder: &Decoder,
        pending: Vec<RawDocument>,
        mut results: ResultSet,
    ) -> Option<ResultSet> {
        if !self.options.best_effort {
            return None;
        }
        decode_into(decoder, pending, &mut results);
        Some(results.into_truncated())
    }

    fn check_cancelled(&self, cancel: &CancelToken) -> Result<(), RunError> {
        if cancel.is_cancelled() {
            Err(RunError::Cancelled {
                stage: self.state,
                partial: None,
            })
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Run state changed");
        self.state = next;
    }
}

enum Decoder {
    Serial,
    Pool(rayon::ThreadPool),
}

impl Decoder {
    fn new(workers: usize) -> Self {
        if workers <= 1 {
            return Decoder::Serial;
        }
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => Decoder::Pool(pool),
            Err(err) => {
                warn!(workers, error = %err, "Could not start decode pool, decoding serially");
                Decoder::Serial
            }
        }
    }

    fn decode(&self, batch: Vec<RawDocument>) -> Vec<Tagged> {
        match self {
            Decoder::Serial => batch.iter().map(decode_tagged).collect(),
            Decoder::Pool(pool) => pool.install(|| batch.par_iter().map(decode_tagged).collect()),
        }
    }
}

fn decode_tagged(doc: &RawDocument) -> Tagged {
    (doc.position, decode_system(&doc.body))
}

fn decode_into(decoder: &Decoder, batch: Vec<RawDocument>, results: &mut ResultSet) {
    if batch.is_empty() {
        return;
    }
    let outcomes = decoder.decode(batch);
    for (position, outcome) in &outcomes {
        if let Err(err) = outcome {
            warn!(
                position,
                document = err.document_id.as_deref().unwrap_or("<unidentified>"),
                field = %err.field,
                "Skipping document: {}",
                err.kind
            );
        }
    }
    results.extend_tagged(outcomes);
}

/// Systems controlled by `power` in any of `states`, read from the embedded
/// store described by `config`
pub fn run_power_query<S: AsRef<str>>(
    config: &StoreConfig,
    power: &str,
    states: &[S],
    options: RunOptions,
    cancel: &CancelToken,
) -> Result<ResultSet, RunError> {
    let filter = QueryFilter::power_control(power, states)?;
    let connector = SqliteConnector::new(config.endpoint.clone());
    Pipeline::new(connector, config.database.clone(), config.collection.clone())
        .with_options(options)
        .run(&filter, cancel)
}
