//! SearchProvider implementation for SQLite.

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};

use crate::core::SearchProvider;
use crate::document::codec::{from_canonical, parse_date};
use crate::document::{inflate, project, Datatype, StoredValue, Triple};
use crate::error::{DocumentError, StorageResult, ValueError};
use crate::search::sort::{paginate, sort_documents};
use crate::types::{
    AggregateFunction, DocumentSet, RawResult, ReturnShape, Search, SearchResults, StoredDocument,
};

use super::search::{rewrite_select, QueryBuilder, SqlFragment};
use super::SqliteDocumentStore;

impl SearchProvider for SqliteDocumentStore {
    fn search_documents(&self, search: &Search) -> StorageResult<DocumentSet> {
        self.search_documents_rooted(search, "")
    }

    fn search_keys(&self, search: &Search) -> StorageResult<Vec<String>> {
        let conn = self.connection();
        let query = {
            let registry = self.inner.registry.read();
            QueryBuilder::new(&registry).build_keys(search, true)?
        };
        query_keys(&conn, &query)
    }

    fn execute_raw(&self, sql: &str) -> StorageResult<RawResult> {
        let conn = self.connection();
        tracing::debug!(sql = %sql, "Executing raw statement");

        let mut stmt = conn.prepare(sql)?;
        let readonly = stmt.readonly();
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(value_to_text))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }
        drop(cursor);
        drop(stmt);

        if !readonly {
            self.reload_registry_locked(&conn)?;
        }
        Ok(RawResult::new(columns, rows))
    }

    fn execute_raw_as(&self, sql: &str, shape: ReturnShape) -> StorageResult<SearchResults> {
        let rewritten = rewrite_select(sql, shape)?;
        let conn = self.connection();
        tracing::debug!(sql = %rewritten, "Executing shaped raw query");

        let mut stmt = conn.prepare(&rewritten)?;
        match shape {
            ReturnShape::Keys => {
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(SearchResults::Keys(keys))
            }
            ReturnShape::Records => {
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut documents = Vec::with_capacity(rows.len());
                for (key, snapshot, class_name, created_at) in rows {
                    let record = from_canonical(&snapshot)?;
                    let created_at = parse_created_at(&created_at)?;
                    documents.push(StoredDocument::with_created_at(
                        key, class_name, created_at, record,
                    ));
                }
                Ok(SearchResults::Documents(DocumentSet::new(documents, false)))
            }
        }
    }

    fn aggregate(
        &self,
        function: AggregateFunction,
        attribute: &str,
        search: &Search,
    ) -> StorageResult<Option<f64>> {
        let conn = self.connection();
        let query = {
            let registry = self.inner.registry.read();
            QueryBuilder::new(&registry).build_aggregate(function, attribute, search)?
        };
        tracing::debug!(sql = %query.sql, params = query.params.len(), "Executing aggregate");

        let result: Option<f64> =
            conn.query_row(&query.sql, params_from_iter(query.params.iter()), |row| {
                row.get(0)
            })?;
        Ok(result)
    }

    fn explain(&self, sql: &str) -> StorageResult<RawResult> {
        self.execute_raw(&format!("EXPLAIN QUERY PLAN {}", sql))
    }
}

impl SqliteDocumentStore {
    /// Returns the key query `search` compiles to against the current
    /// datatype registry.
    ///
    /// The statement is the one a records search runs before loading
    /// documents: pagination is bound in SQL unless the search sorts.
    pub fn compiled_sql(&self, search: &Search) -> StorageResult<SqlFragment> {
        let registry = self.inner.registry.read();
        let query = QueryBuilder::new(&registry).build_keys(search, search.sort().is_empty())?;
        Ok(query)
    }

    /// Runs a records search, resolving sort descriptors below `sort_root`.
    pub(crate) fn search_documents_rooted(
        &self,
        search: &Search,
        sort_root: &str,
    ) -> StorageResult<DocumentSet> {
        let sorted = !search.sort().is_empty();

        let (mut documents, failures) = {
            let conn = self.connection();
            let query = {
                let registry = self.inner.registry.read();
                QueryBuilder::new(&registry).build_keys(search, !sorted)?
            };
            let keys = query_keys(&conn, &query)?;
            load_documents(&conn, &keys, self.config().bulk_load_chunk_size)?
        };

        if sorted {
            sort_documents(&mut documents, search.sort(), sort_root);
            documents = paginate(documents, search.offset(), search.limit());
        }

        if let Some(allow_list) = search.attributes_to_return() {
            for document in &mut documents {
                let projected = project(document.record(), allow_list);
                document.set_record(projected);
            }
        }

        Ok(DocumentSet::new(documents, sorted).with_failures(failures))
    }
}

fn query_keys(conn: &Connection, query: &SqlFragment) -> StorageResult<Vec<String>> {
    tracing::debug!(sql = %query.sql, params = query.params.len(), "Executing key query");
    let mut stmt = conn.prepare(&query.sql)?;
    let keys = stmt
        .query_map(params_from_iter(query.params.iter()), |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
}

/// Loads and inflates the documents stored under `keys`, in the given order.
///
/// Keys that no longer exist are skipped. Keys whose rows cannot be rebuilt
/// are returned as failures instead of failing the whole load.
pub(crate) fn load_documents(
    conn: &Connection,
    keys: &[String],
    chunk_size: usize,
) -> StorageResult<(Vec<StoredDocument>, Vec<DocumentError>)> {
    let mut documents = Vec::with_capacity(keys.len());
    let mut failures = Vec::new();

    for chunk in keys.chunks(chunk_size.max(1)) {
        let placeholders = vec!["?"; chunk.len()].join(", ");

        let mut meta: HashMap<String, (String, String)> = HashMap::with_capacity(chunk.len());
        {
            let sql = format!(
                "SELECT doc_key, class_name, created_at FROM doc_keys WHERE doc_key IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                meta.insert(row.get(0)?, (row.get(1)?, row.get(2)?));
            }
        }

        let mut triples: HashMap<String, Vec<Triple>> = HashMap::with_capacity(chunk.len());
        let mut bad_tags: HashMap<String, String> = HashMap::new();
        {
            let sql = format!(
                "SELECT doc_key, attribute, value, datatype FROM doc_values WHERE doc_key IN ({})",
                placeholders
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let key: String = row.get(0)?;
                let attribute: String = row.get(1)?;
                let value = stored_value(row.get_ref(2)?);
                let tag: String = row.get(3)?;
                match tag.parse::<Datatype>() {
                    Ok(datatype) => triples
                        .entry(key)
                        .or_default()
                        .push(Triple::new(attribute, value, datatype)),
                    Err(_) => {
                        bad_tags.entry(key).or_insert(attribute);
                    }
                }
            }
        }

        for key in chunk {
            let Some((class_name, created_at)) = meta.remove(key) else {
                continue;
            };

            if let Some(path) = bad_tags.remove(key) {
                tracing::warn!("Skipping document {}: unknown datatype at '{}'", key, path);
                failures.push(DocumentError::InconsistentPathSet {
                    key: key.clone(),
                    path,
                    message: "unknown datatype tag".to_string(),
                });
                continue;
            }

            match inflate(key, triples.remove(key).unwrap_or_default()) {
                Ok(record) => {
                    let created_at = parse_created_at(&created_at)?;
                    documents.push(StoredDocument::with_created_at(
                        key.clone(),
                        class_name,
                        created_at,
                        record,
                    ));
                }
                Err(err) => {
                    tracing::warn!("Skipping document {}: {}", key, err);
                    failures.push(err);
                }
            }
        }
    }

    Ok((documents, failures))
}

fn parse_created_at(raw: &str) -> StorageResult<DateTime<Utc>> {
    parse_date(raw).ok_or_else(|| {
        ValueError::Undecodable {
            datatype: Datatype::Date.to_string(),
            raw: raw.to_string(),
        }
        .into()
    })
}

fn stored_value(value: ValueRef<'_>) -> StoredValue {
    match value {
        ValueRef::Blob(bytes) => StoredValue::Blob(bytes.to_vec()),
        other => StoredValue::Text(value_to_text(other).unwrap_or_default()),
    }
}

/// Renders a column value as text; blobs are base64-encoded.
fn value_to_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Some(BASE64.encode(bytes)),
    }
}
