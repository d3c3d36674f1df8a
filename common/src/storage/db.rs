use std::{
    path::PathBuf,
    time::Duration,
};

use rusqlite::{types::ValueRef, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::AppError;

/// Busy timeout applied to every connection.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Handle to the relational store.
///
/// Connections are opened and closed per operation; no transaction ever spans
/// more than one call. Imported tables are dynamically named, so everything
/// here works through `sqlite_master` rather than a fixed schema.
#[derive(Debug, Clone)]
pub struct SqliteClient {
    path: PathBuf,
}

impl SqliteClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Opens a short-lived connection.
    pub fn open(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Cheap health check used by the readiness probe.
    pub fn ping(&self) -> Result<(), AppError> {
        let conn = self.open()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    /// Names of all user tables, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>, AppError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = tables.len(), "listed store tables");
        Ok(tables)
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, AppError> {
        let conn = self.open()?;
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Drops a table if it exists. Returns whether anything was dropped.
    pub fn drop_table(&self, name: &str) -> Result<bool, AppError> {
        if !self.table_exists(name)? {
            return Ok(false);
        }
        let conn = self.open()?;
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))?;
        info!(table = name, "dropped table");
        Ok(true)
    }

    /// Drops every user table. Returns the number of tables removed.
    pub fn clear_tables(&self) -> Result<usize, AppError> {
        let tables = self.list_tables()?;
        let conn = self.open()?;
        for table in &tables {
            conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
        }
        info!(count = tables.len(), "cleared all store tables");
        Ok(tables.len())
    }

    /// Fetches up to `limit` rows from a table as JSON objects.
    ///
    /// A missing table yields an empty result rather than an error; callers
    /// resolving stale active-dataset pointers rely on that.
    pub fn fetch_rows(&self, name: &str, limit: usize) -> Result<Vec<Map<String, Value>>, AppError> {
        if !self.table_exists(name)? {
            debug!(table = name, "table not found, returning no rows");
            return Ok(Vec::new());
        }

        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} LIMIT ?1",
            quote_ident(name)
        ))?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|c| (*c).to_string())
            .collect();

        let mut rows = stmt.query([limit as i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = Map::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                object.insert(column.clone(), json_value(row.get_ref(index)?));
            }
            out.push(object);
        }
        Ok(out)
    }
}

/// Quotes an identifier for use in dynamically built SQL.
///
/// Table names are derived from uploaded file names, so they must never be
/// interpolated unquoted.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(format!("<blob {} bytes>", b.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> (tempfile::TempDir, SqliteClient) {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = SqliteClient::new(dir.path().join("test.db"));
        (dir, client)
    }

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn list_drop_and_fetch_round_trip() {
        let (_dir, client) = test_client();
        let conn = client.open().expect("open");
        conn.execute_batch(
            "CREATE TABLE \"20250101_upload1_Stats\" (JVM_Id TEXT, Count INTEGER);
             INSERT INTO \"20250101_upload1_Stats\" VALUES ('jvm-1', 3), ('jvm-2', 5);",
        )
        .expect("seed");
        drop(conn);

        assert_eq!(
            client.list_tables().expect("list"),
            vec!["20250101_upload1_Stats".to_string()]
        );
        assert!(client.table_exists("20250101_upload1_Stats").expect("exists"));

        let rows = client.fetch_rows("20250101_upload1_Stats", 10).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("JVM_Id"), Some(&Value::from("jvm-1")));
        assert_eq!(rows[0].get("Count"), Some(&Value::from(3)));

        // Missing tables are not an error.
        assert!(client.fetch_rows("nope", 10).expect("missing").is_empty());

        assert!(client.drop_table("20250101_upload1_Stats").expect("drop"));
        assert!(!client.drop_table("20250101_upload1_Stats").expect("drop again"));
        assert!(client.list_tables().expect("list").is_empty());
    }

    #[test]
    fn clear_tables_removes_everything() {
        let (_dir, client) = test_client();
        let conn = client.open().expect("open");
        conn.execute_batch("CREATE TABLE a (x); CREATE TABLE b (y);")
            .expect("seed");
        drop(conn);

        assert_eq!(client.clear_tables().expect("clear"), 2);
        assert!(client.list_tables().expect("list").is_empty());
    }
}
