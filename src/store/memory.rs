use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

use super::{validate_collection_name, Connector, DocumentCursor, DocumentStore, RawDocument};
use crate::error::{CursorError, StoreError};
use crate::filter::QueryFilter;

/// In-process document store holding one database.
///
/// The filter is evaluated inside the store at `find` time, so callers see
/// the same contract as with an external server. Connecting hands out a
/// snapshot copy; later inserts do not affect already-open stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    database: String,
    collections: HashMap<String, Vec<Value>>,
    closed: bool,
}

impl MemoryStore {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, collection: &str, doc: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);
    }

    pub fn with_collection(mut self, collection: &str, docs: impl IntoIterator<Item = Value>) -> Self {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Connector for MemoryStore {
    type Store = MemoryStore;

    fn endpoint(&self) -> String {
        format!("memory://{}", self.database)
    }

    fn connect(&self, database: &str) -> Result<MemoryStore, StoreError> {
        if database != self.database {
            return Err(StoreError::DatabaseNotFound {
                database: database.to_string(),
                path: PathBuf::from(self.endpoint()),
            });
        }
        let mut store = self.clone();
        store.closed = false;
        Ok(store)
    }
}

impl DocumentStore for MemoryStore {
    fn ping(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn find<'s>(
        &'s self,
        collection: &str,
        filter: &QueryFilter,
        _batch_size: usize,
    ) -> Result<Box<dyn DocumentCursor + 's>, StoreError> {
        validate_collection_name(collection)?;
        if self.closed {
            return Err(StoreError::Closed);
        }
        let docs = self
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))?;

        let matches: Vec<&'s Value> = docs.iter().filter(|d| filter.matches(d)).collect();
        Ok(Box::new(MemoryCursor {
            docs: matches.into_iter(),
            delivered: 0,
            closed: false,
        }))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

pub struct MemoryCursor<'s> {
    docs: std::vec::IntoIter<&'s Value>,
    delivered: usize,
    closed: bool,
}

impl DocumentCursor for MemoryCursor<'_> {
    fn has_next(&mut self) -> Result<bool, CursorError> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        Ok(!self.docs.as_slice().is_empty())
    }

    fn next_document(&mut self) -> Result<RawDocument, CursorError> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        let body = self.docs.next().ok_or(CursorError::Exhausted)?.clone();
        let position = self.delivered;
        self.delivered += 1;
        Ok(RawDocument { position, body })
    }

    fn position(&self) -> usize {
        self.delivered
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_find() {
        let source = MemoryStore::new("galaxy").with_collection(
            "systems",
            vec![
                json!({"name": "A", "powerState": "Exploited"}),
                json!({"name": "B", "powerState": "Unoccupied"}),
                json!({"name": "C", "powerState": "Exploited"}),
            ],
        );
        let store = source.connect("galaxy").unwrap();
        let filter = QueryFilter::builder().eq("powerState", "Exploited").build().unwrap();

        let mut cursor = store.find("systems", &filter, 1).unwrap();
        assert!(cursor.has_next().unwrap());
        assert_eq!(cursor.next_document().unwrap().body["name"], "A");
        let second = cursor.next_document().unwrap();
        assert_eq!(second.position, 1);
        assert_eq!(second.body["name"], "C");
        assert!(!cursor.has_next().unwrap());
        assert_eq!(cursor.next_document(), Err(CursorError::Exhausted));
    }

    #[test]
    fn test_memory_errors() {
        let source = MemoryStore::new("galaxy");
        assert!(matches!(
            source.connect("other"),
            Err(StoreError::DatabaseNotFound { .. })
        ));

        let mut store = source.connect("galaxy").unwrap();
        assert!(matches!(
            store.find("systems", &QueryFilter::default(), 10),
            Err(StoreError::UnknownCollection(_))
        ));
        store.close();
        assert!(matches!(store.ping(), Err(StoreError::Closed)));
    }
}
