use std::path::Path;

use common::{
    error::AppError,
    storage::{
        db::{quote_ident, SqliteClient},
        types::{session::SessionId, table_ref::TableRef},
    },
};
use rusqlite::{params_from_iter, types::Value};
use tracing::info;

use crate::pipeline::ImportedTable;

/// Column names (case-insensitive) holding timestamps that must be stored as
/// integer milliseconds-since-epoch. The converter emits these in mixed
/// textual and floating formats; all downstream time-range filtering assumes
/// integers.
pub const TIMESTAMP_COLUMNS: [&str; 5] = [
    "JVM_STARTTIME",
    "LE_TIMESTAMP",
    "CLIENTTIMESTAMP",
    "STARTTIME",
    "LE_MDC_SAMPLESTARTTIME",
];

pub fn is_timestamp_column(name: &str) -> bool {
    TIMESTAMP_COLUMNS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(name.trim()))
}

/// Parses a raw timestamp cell as a decimal number truncated to an integer.
/// Empty or unparseable values become NULL. Idempotent on integer input.
pub fn normalize_timestamp(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| value.trunc() as i64)
}

/// Imports one converter output file into its session-scoped table.
///
/// Any existing table of the same name is dropped first: table identity is
/// not stable across re-imports of the same session id. The whole load runs
/// in a single transaction, so a failed file leaves no half-imported table.
pub fn import_csv(
    db: &SqliteClient,
    csv_path: &Path,
    session: &SessionId,
) -> Result<ImportedTable, AppError> {
    let table = TableRef::from_output_file(session.clone(), csv_path).ok_or_else(|| {
        AppError::Import(format!("no usable file name in {}", csv_path.display()))
    })?;
    let table_name = table.table_name();

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .map_err(|err| AppError::Import(format!("{}: {err}", csv_path.display())))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| AppError::Import(format!("{}: {err}", csv_path.display())))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(AppError::Import(format!(
            "{} has no header row",
            csv_path.display()
        )));
    }
    let timestamp_mask: Vec<bool> = headers
        .iter()
        .map(|header| is_timestamp_column(header))
        .collect();

    let column_defs = headers
        .iter()
        .zip(&timestamp_mask)
        .map(|(header, is_timestamp)| {
            let affinity = if *is_timestamp { "INTEGER" } else { "TEXT" };
            format!("{} {affinity}", quote_ident(header))
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut conn = db.open()?;
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {ident}; CREATE TABLE {ident} ({column_defs});",
        ident = quote_ident(&table_name),
    ))?;

    let placeholders = (1..=headers.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");

    let tx = conn.transaction()?;
    let mut rows = 0u64;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} VALUES ({placeholders})",
            quote_ident(&table_name),
        ))?;
        for record in reader.records() {
            let record = record
                .map_err(|err| AppError::Import(format!("{}: {err}", csv_path.display())))?;
            let mut values = Vec::with_capacity(headers.len());
            for (index, is_timestamp) in timestamp_mask.iter().enumerate() {
                let raw = record.get(index).unwrap_or("");
                if *is_timestamp {
                    values.push(normalize_timestamp(raw).map_or(Value::Null, Value::Integer));
                } else {
                    values.push(Value::Text(raw.to_string()));
                }
            }
            stmt.execute(params_from_iter(values))?;
            rows = rows.saturating_add(1);
        }
    }
    tx.commit()?;

    info!(table = %table_name, rows, file = %csv_path.display(), "imported CSV into store");
    Ok(ImportedTable { table_name, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionId {
        SessionId::from_folder_name("20250101_upload1")
    }

    fn test_db(dir: &Path) -> SqliteClient {
        SqliteClient::new(dir.join("test.db"))
    }

    #[test]
    fn timestamp_columns_match_case_insensitively() {
        assert!(is_timestamp_column("LE_Timestamp"));
        assert!(is_timestamp_column("jvm_starttime"));
        assert!(is_timestamp_column(" StartTime "));
        assert!(!is_timestamp_column("ElapsedSeconds"));
    }

    #[test]
    fn normalization_truncates_and_nulls() {
        assert_eq!(normalize_timestamp("1735689600123.75"), Some(1735689600123));
        assert_eq!(normalize_timestamp("1735689600123"), Some(1735689600123));
        assert_eq!(normalize_timestamp(""), None);
        assert_eq!(normalize_timestamp("n/a"), None);
    }

    #[test]
    fn normalization_is_idempotent_on_integer_input() {
        let once = normalize_timestamp("1735689600123").expect("parse");
        let twice = normalize_timestamp(&once.to_string()).expect("reparse");
        assert_eq!(once, twice);
    }

    #[test]
    fn imports_rows_and_normalizes_timestamps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = dir.path().join("TopSQLStats.csv");
        std::fs::write(
            &csv_path,
            "JVM_Id,LE_Timestamp,Statement\n\
             jvm-1,1735689600123.75,SELECT 1\n\
             jvm-2,,SELECT 2\n\
             jvm-3,bogus,SELECT 3\n",
        )
        .expect("write csv");

        let db = test_db(dir.path());
        let imported = import_csv(&db, &csv_path, &session()).expect("import");
        assert_eq!(imported.table_name, "20250101_upload1_TopSQLStats");
        assert_eq!(imported.rows, 3);

        let rows = db
            .fetch_rows("20250101_upload1_TopSQLStats", 10)
            .expect("rows");
        assert_eq!(rows[0].get("LE_Timestamp"), Some(&serde_json::json!(1735689600123_i64)));
        assert_eq!(rows[1].get("LE_Timestamp"), Some(&serde_json::Value::Null));
        assert_eq!(rows[2].get("LE_Timestamp"), Some(&serde_json::Value::Null));
        assert_eq!(rows[0].get("Statement"), Some(&serde_json::json!("SELECT 1")));
    }

    #[test]
    fn reimport_replaces_the_existing_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = dir.path().join("CacheStatistics.csv");
        std::fs::write(&csv_path, "Name,Hits\nquery-cache,10\nentity-cache,4\n")
            .expect("write csv");

        let db = test_db(dir.path());
        import_csv(&db, &csv_path, &session()).expect("first import");

        std::fs::write(&csv_path, "Name,Hits\nquery-cache,99\n").expect("rewrite csv");
        let imported = import_csv(&db, &csv_path, &session()).expect("second import");
        assert_eq!(imported.rows, 1);

        let rows = db
            .fetch_rows("20250101_upload1_CacheStatistics", 10)
            .expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Hits"), Some(&serde_json::json!("99")));
    }

    #[test]
    fn hyphenated_file_names_produce_underscored_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = dir.path().join("log-event-categories.csv");
        std::fs::write(&csv_path, "Category,Count\nERROR,2\n").expect("write csv");

        let db = test_db(dir.path());
        let imported = import_csv(&db, &csv_path, &session()).expect("import");
        assert_eq!(
            imported.table_name,
            "20250101_upload1_log_event_categories"
        );
    }

    #[test]
    fn unreadable_file_is_an_import_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = test_db(dir.path());
        let err = import_csv(&db, &dir.path().join("absent.csv"), &session())
            .expect_err("missing file");
        assert!(matches!(err, AppError::Import(_)), "got {err:?}");
    }
}
