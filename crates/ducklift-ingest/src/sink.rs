//! DuckDB table sink
//!
//! Thin adapter over an embedded DuckDB connection. Loads are destructive:
//! `CREATE OR REPLACE` discards any prior table of the same name, so
//! re-running an entry yields an identical table rather than appending.

use duckdb::types::ValueRef;
use duckdb::Connection;
use ducklift_common::{IngestError, Result, StructuredTable};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

/// What a job entry loads into its target table
#[derive(Debug)]
pub enum Payload {
    /// Relational load: one column per field, typed by inference
    Table(StructuredTable),
    /// Schema-opaque load: the whole mapping as one JSON-encoded text cell
    Json(Value),
}

/// Sink over a DuckDB database
///
/// The connection is behind a `Mutex` so a sink can be shared across
/// threads; writes within one run are sequential regardless.
pub struct DuckDbSink {
    conn: Mutex<Connection>,
}

impl DuckDbSink {
    /// Open (or create) a file-backed database
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        info!(path = %path.display(), "Connecting to DuckDB database");
        let conn = Connection::open(path)
            .map_err(|e| IngestError::database(format!("Failed to open DuckDB: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database, for tests and dry runs
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IngestError::database(format!("Failed to create in-memory DuckDB: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Load a payload into `table_name`, replacing any prior table
    pub fn load(&self, table_name: &str, payload: Payload) -> Result<usize> {
        match payload {
            Payload::Table(table) => self.create_or_replace_table(table_name, &table),
            Payload::Json(value) => self.create_or_replace_json_table(table_name, &value),
        }
    }

    /// Create or fully replace a relational table from a structured table
    ///
    /// Returns the number of rows loaded. An input with no inferable
    /// columns produces a zero-row placeholder table, since the store
    /// cannot represent a table without columns.
    pub fn create_or_replace_table(&self, table_name: &str, table: &StructuredTable) -> Result<usize> {
        let conn = self.lock()?;

        let columns = if table.columns.is_empty() {
            warn!(
                table_name,
                "No columns to load, creating a zero-row placeholder table"
            );
            vec![(quote_ident("placeholder"), "VARCHAR")]
        } else {
            table
                .columns
                .iter()
                .enumerate()
                .map(|(i, name)| (quote_ident(name), infer_column_type(table, i)))
                .collect()
        };

        let column_defs: Vec<String> = columns
            .iter()
            .map(|(name, ty)| format!("{name} {ty}"))
            .collect();
        let create_sql = format!(
            "CREATE OR REPLACE TABLE {} ({})",
            quote_ident(table_name),
            column_defs.join(", ")
        );
        conn.execute_batch(&create_sql).map_err(duckdb_error)?;

        if !table.rows.is_empty() {
            let placeholders = vec!["?"; table.columns.len()].join(", ");
            let insert_sql = format!(
                "INSERT INTO {} VALUES ({placeholders})",
                quote_ident(table_name)
            );
            let mut stmt = conn.prepare(&insert_sql).map_err(duckdb_error)?;
            for row in &table.rows {
                stmt.execute(duckdb::params_from_iter(row.iter().map(json_to_sql)))
                    .map_err(duckdb_error)?;
            }
        }

        info!(
            table_name,
            rows = table.num_rows(),
            columns = table.num_columns(),
            "Table created"
        );
        Ok(table.num_rows())
    }

    /// Create or fully replace a single-column table holding one JSON document
    ///
    /// Exists for configuration-shaped payloads that have no tabular
    /// structure; only JSON objects are accepted.
    pub fn create_or_replace_json_table(&self, table_name: &str, value: &Value) -> Result<usize> {
        if !value.is_object() {
            return Err(IngestError::UnsupportedPayload(format!(
                "expected a JSON mapping, found {}",
                json_type_name(value)
            )));
        }

        let conn = self.lock()?;
        let quoted = quote_ident(table_name);

        conn.execute_batch(&format!("CREATE OR REPLACE TABLE {quoted} (data VARCHAR)"))
            .map_err(duckdb_error)?;
        conn.execute(
            &format!("INSERT INTO {quoted} VALUES (?)"),
            [serde_json::to_string(value)?],
        )
        .map_err(duckdb_error)?;

        info!(table_name, "JSON table created");
        Ok(1)
    }

    /// Read a table back into a structured table
    pub fn select_table(&self, table_name: &str) -> Result<StructuredTable> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(table_name)))
            .map_err(duckdb_error)?;
        let mut result_rows = stmt.query([]).map_err(duckdb_error)?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{i}"))
            })
            .collect();

        let mut table = StructuredTable::new(columns);
        while let Some(row) = result_rows.next().map_err(duckdb_error)? {
            let cells = (0..column_count)
                .map(|i| match row.get_ref(i) {
                    Ok(value_ref) => value_ref_to_json(value_ref),
                    Err(_) => Value::Null,
                })
                .collect();
            table.push_row(cells);
        }

        Ok(table)
    }

    /// True when a table of this name exists in the main schema
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
                [table_name],
                |row| row.get(0),
            )
            .map_err(duckdb_error)?;
        Ok(count > 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| IngestError::database(format!("Connection lock poisoned: {e}")))
    }
}

fn duckdb_error(err: duckdb::Error) -> IngestError {
    IngestError::Database(err.to_string())
}

/// Double-quote an identifier, escaping embedded quotes
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

/// Infer a column type from the cells of one column
///
/// All-integer columns become BIGINT, numeric columns with any float
/// become DOUBLE, all-boolean columns become BOOLEAN; everything else
/// (including mixed types and all-null columns) falls back to VARCHAR.
fn infer_column_type(table: &StructuredTable, index: usize) -> &'static str {
    let mut saw_int = false;
    let mut saw_float = false;
    let mut saw_bool = false;
    let mut saw_other = false;

    for row in &table.rows {
        match &row[index] {
            Value::Null => {},
            Value::Number(n) if n.is_i64() || n.is_u64() => saw_int = true,
            Value::Number(_) => saw_float = true,
            Value::Bool(_) => saw_bool = true,
            _ => saw_other = true,
        }
    }

    match (saw_other, saw_bool, saw_float, saw_int) {
        (true, _, _, _) => "VARCHAR",
        (false, true, false, false) => "BOOLEAN",
        (false, false, true, _) => "DOUBLE",
        (false, false, false, true) => "BIGINT",
        _ => "VARCHAR",
    }
}

fn json_to_sql(value: &Value) -> duckdb::types::Value {
    use duckdb::types::Value as SqlValue;

    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::BigInt(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Double(f)
            } else {
                SqlValue::Text(n.to_string())
            }
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn value_ref_to_json(value: ValueRef) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::Number(i.into()),
        ValueRef::SmallInt(i) => Value::Number(i.into()),
        ValueRef::Int(i) => Value::Number(i.into()),
        ValueRef::BigInt(i) => Value::Number(i.into()),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        other => Value::String(format!("{other:?}")),
    }
}
