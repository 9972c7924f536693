use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{HistoryError, HistoryFilter, HistoryStore, QueryEvent, QueryRecord};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    indexer_id INTEGER NOT NULL,
    indexer TEXT NOT NULL,
    search_type TEXT NOT NULL,
    successful INTEGER NOT NULL,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_query_history_timestamp ON query_history(timestamp);
CREATE INDEX IF NOT EXISTS idx_query_history_indexer_id ON query_history(indexer_id);
CREATE INDEX IF NOT EXISTS idx_query_history_search_type ON query_history(search_type);
"#;

/// SQLite-backed query history store
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Create a new store, creating the database file and tables if needed
    pub fn new(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path).map_err(|e| HistoryError::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| HistoryError::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn build_where_clause(filter: &HistoryFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(indexer_id) = filter.indexer_id {
            conditions.push("indexer_id = ?");
            params.push(Box::new(indexer_id));
        }

        if let Some(ref search_type) = filter.search_type {
            conditions.push("search_type = ?");
            params.push(Box::new(search_type.clone()));
        }

        if let Some(successful) = filter.successful {
            conditions.push("successful = ?");
            params.push(Box::new(successful));
        }

        if let Some(ref from) = filter.from {
            conditions.push("timestamp >= ?");
            params.push(Box::new(from.to_rfc3339()));
        }

        if let Some(ref to) = filter.to {
            conditions.push("timestamp <= ?");
            params.push(Box::new(to.to_rfc3339()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn insert(&self, record: &QueryRecord) -> Result<i64, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let data_json = serde_json::to_string(&record.data)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO query_history (timestamp, indexer_id, indexer, search_type, successful, data) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                record.timestamp.to_rfc3339(),
                record.indexer_id,
                record.indexer,
                record.search_type,
                record.successful,
                data_json,
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn query(&self, filter: &HistoryFilter) -> Result<Vec<QueryRecord>, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT id, timestamp, indexer_id, indexer, search_type, successful, data FROM query_history {} ORDER BY timestamp DESC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let id: i64 = row.get(0)?;
                let timestamp_str: String = row.get(1)?;
                let indexer_id: i32 = row.get(2)?;
                let indexer: String = row.get(3)?;
                let search_type: String = row.get(4)?;
                let successful: bool = row.get(5)?;
                let data_json: String = row.get(6)?;

                Ok((
                    id,
                    timestamp_str,
                    indexer_id,
                    indexer,
                    search_type,
                    successful,
                    data_json,
                ))
            })
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            let (id, timestamp_str, indexer_id, indexer, search_type, successful, data_json) =
                row_result.map_err(|e| HistoryError::Database(e.to_string()))?;

            let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp_str)
                .map_err(|e| HistoryError::Database(format!("Invalid timestamp: {}", e)))?
                .into();

            let data: QueryEvent = serde_json::from_str(&data_json)
                .map_err(|e| HistoryError::Serialization(e.to_string()))?;

            records.push(QueryRecord {
                id,
                timestamp,
                indexer_id,
                indexer,
                search_type,
                successful,
                data,
            });
        }

        Ok(records)
    }

    fn count(&self, filter: &HistoryFilter) -> Result<i64, HistoryError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM query_history {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexers::QueryTelemetry;
    use crate::search::SearchCriteria;
    use chrono::Duration;

    fn create_test_store() -> SqliteHistoryStore {
        SqliteHistoryStore::in_memory().unwrap()
    }

    fn create_record(indexer_id: i32, successful: bool) -> QueryRecord {
        let event = QueryEvent {
            indexer_id,
            indexer: format!("indexer-{indexer_id}"),
            criteria: SearchCriteria::basic("stargate"),
            telemetry: successful.then(|| QueryTelemetry {
                url: "https://indexer.example/api".to_string(),
                status: 200,
                elapsed_ms: 80,
                item_count: 2,
            }),
        };
        QueryRecord {
            id: 0,
            timestamp: Utc::now(),
            indexer_id,
            indexer: event.indexer.clone(),
            search_type: event.search_type().to_string(),
            successful,
            data: event,
        }
    }

    #[test]
    fn test_insert_and_query() {
        let store = create_test_store();
        let record = create_record(1, true);

        let id = store.insert(&record).unwrap();
        assert!(id > 0);

        let results = store.query(&HistoryFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].indexer, "indexer-1");
        assert!(results[0].successful);
        assert!(results[0].data.telemetry.is_some());
    }

    #[test]
    fn test_query_by_indexer_id() {
        let store = create_test_store();

        store.insert(&create_record(1, true)).unwrap();
        store.insert(&create_record(1, true)).unwrap();
        store.insert(&create_record(2, true)).unwrap();

        let filter = HistoryFilter::new().with_indexer_id(1);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_query_by_successful() {
        let store = create_test_store();

        store.insert(&create_record(1, true)).unwrap();
        store.insert(&create_record(1, false)).unwrap();
        store.insert(&create_record(2, false)).unwrap();

        let filter = HistoryFilter::new().with_successful(false);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.data.telemetry.is_none()));
    }

    #[test]
    fn test_query_with_time_range() {
        let store = create_test_store();

        let now = Utc::now();
        let mut old_record = create_record(1, true);
        old_record.timestamp = now - Duration::hours(2);
        store.insert(&old_record).unwrap();

        let mut new_record = create_record(1, true);
        new_record.timestamp = now;
        store.insert(&new_record).unwrap();

        // Query only recent events
        let filter = HistoryFilter::new().with_time_range(Some(now - Duration::hours(1)), None);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_pagination() {
        let store = create_test_store();

        for i in 0..5 {
            store.insert(&create_record(i, true)).unwrap();
        }

        let filter = HistoryFilter::new().with_limit(2).with_offset(0);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 2);

        let filter = HistoryFilter::new().with_limit(2).with_offset(4);
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_count() {
        let store = create_test_store();

        store.insert(&create_record(1, true)).unwrap();
        store.insert(&create_record(1, false)).unwrap();
        store.insert(&create_record(2, true)).unwrap();

        let count = store.count(&HistoryFilter::new()).unwrap();
        assert_eq!(count, 3);

        let filter = HistoryFilter::new().with_successful(true);
        let count = store.count(&filter).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteHistoryStore::new(&db_path).unwrap();
        store.insert(&create_record(1, true)).unwrap();

        // Verify file was created
        assert!(db_path.exists());

        let results = store.query(&HistoryFilter::new()).unwrap();
        assert_eq!(results.len(), 1);
    }
}
