use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;

use super::sqlite::database_path;
use super::validate_collection_name;
use crate::config::StoreConfig;

const BATCH_SIZE: usize = 1000;

/// Writes documents into the embedded store
pub struct DocumentWriter {
    conn: Connection,
    path: PathBuf,
}

impl DocumentWriter {
    /// Open (creating if needed) the database file for `database`
    pub fn create(endpoint: &Path, database: &str) -> Result<Self> {
        fs::create_dir_all(endpoint)
            .with_context(|| format!("Failed to create store directory {:?}", endpoint))?;

        let path = database_path(endpoint, database);
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database {:?}", path))?;

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;",
        )?;

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the collection table, dropping an existing one if `replace`
    pub fn create_collection(&mut self, collection: &str, replace: bool) -> Result<()> {
        let tx = self.conn.transaction()?;
        create_table(&tx, collection, replace)?;
        tx.commit()?;
        Ok(())
    }

    /// Append documents in order
    pub fn insert_documents(&mut self, collection: &str, docs: &[Value]) -> Result<u64> {
        validate_collection_name(collection)?;

        let mut batch = Vec::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            if !doc.is_object() {
                bail!("Document {} is not an object", i);
            }
            batch.push(doc.to_string());
        }

        let tx = self.conn.transaction()?;
        insert_batch(&tx, &insert_sql(collection), &batch)?;
        tx.commit()?;

        Ok(batch.len() as u64)
    }

    /// Import one JSON document per line, as written by `mongoexport`.
    ///
    /// The table setup (including the drop when `replace` is set) and every
    /// insert share one transaction, so a failed import leaves the previous
    /// collection untouched.
    pub fn import_jsonl(
        &mut self,
        collection: &str,
        input: &Path,
        replace: bool,
        progress: &ProgressBar,
    ) -> Result<u64> {
        let file = File::open(input).with_context(|| format!("Failed to open: {:?}", input))?;
        let reader = BufReader::new(file);

        let sql = insert_sql(collection);
        let tx = self.conn.transaction()?;
        create_table(&tx, collection, replace)?;
        let mut count: u64 = 0;
        let mut batch: Vec<String> = Vec::with_capacity(BATCH_SIZE);

        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line")?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let doc: Value = serde_json::from_str(trimmed)
                .with_context(|| format!("Invalid JSON on line {} of {:?}", index + 1, input))?;
            if !doc.is_object() {
                bail!("Line {} of {:?} is not a JSON object", index + 1, input);
            }

            // Keep the exported text so numbers round-trip exactly
            batch.push(trimmed.to_string());

            if batch.len() >= BATCH_SIZE {
                insert_batch(&tx, &sql, &batch)?;
                count += batch.len() as u64;
                progress.set_position(count);
                batch.clear();
            }
        }

        if !batch.is_empty() {
            insert_batch(&tx, &sql, &batch)?;
            count += batch.len() as u64;
        }

        tx.commit()?;
        progress.set_position(count);
        progress.finish_with_message(format!("{}: {} documents", collection, count));

        Ok(count)
    }

    pub fn finalize(self) -> Result<()> {
        self.conn.execute_batch("PRAGMA optimize;")?;
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")?;
        Ok(())
    }
}

fn create_table(conn: &Connection, collection: &str, replace: bool) -> Result<()> {
    validate_collection_name(collection)?;

    if replace {
        conn.execute(&format!("DROP TABLE IF EXISTS \"{}\"", collection), [])
            .with_context(|| format!("Failed to drop collection: {}", collection))?;
    }

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                doc TEXT NOT NULL CHECK (json_valid(doc))
            )",
            collection
        ),
        [],
    )
    .with_context(|| format!("Failed to create collection: {}", collection))?;

    Ok(())
}

fn insert_sql(collection: &str) -> String {
    format!("INSERT INTO \"{}\" (doc) VALUES (?1)", collection)
}

fn insert_batch(tx: &rusqlite::Transaction, sql: &str, batch: &[String]) -> Result<()> {
    let mut stmt = tx.prepare_cached(sql)?;
    for doc in batch {
        stmt.execute([doc])?;
    }
    Ok(())
}

/// Import a JSONL export into the configured database and collection
pub fn import_collection(config: &StoreConfig, input: &Path, replace: bool) -> Result<u64> {
    validate_collection_name(&config.collection)?;
    let mut writer = DocumentWriter::create(&config.endpoint, &config.database)?;

    let line_count = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open: {:?}", input))?,
    )
    .lines()
    .count() as u64;

    let pb = ProgressBar::new(line_count);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:30} [{bar:40.cyan/blue}] {pos}/{len}")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    pb.set_message(config.collection.clone());

    let count = writer.import_jsonl(&config.collection, input, replace, &pb)?;
    info!(
        documents = count,
        database = %writer.path().display(),
        collection = %config.collection,
        "Import finished"
    );
    writer.finalize()?;

    Ok(count)
}
