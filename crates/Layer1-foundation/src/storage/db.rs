//! SQLite-backed `Database`
//!
//! 호스트가 별도 DB를 주입하지 않을 때 플러그인에 줄 수 있는 관계형 저장소.
//! 파라미터와 결과는 JSON 값으로 주고받습니다:
//! - null → NULL, bool → INTEGER(0/1), 정수 → INTEGER, 실수 → REAL
//! - 문자열 → TEXT, 배열/객체 → JSON 문자열 TEXT

use crate::core::{Database, Row};
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Number, Value};
use std::path::Path;
use tracing::debug;

/// SQLite 데이터베이스
pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    /// 파일 DB 열기
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| Error::Storage(format!("Failed to open database: {}", e)))?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| Error::Storage(format!("Failed to set pragmas: {}", e)))?;

        debug!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 메모리 DB (테스트용)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::Storage(format!("Failed to create in-memory database: {}", e))
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn run_query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql_value)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Map::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                map.insert(column.clone(), from_sql_value(row.get_ref(idx)?));
            }
            out.push(map);
        }
        Ok(out)
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.run_query(sql, params)
    }

    async fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.run_query(sql, params)?.into_iter().next())
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let conn = self.conn.lock();
        let changed = conn.execute(sql, params_from_iter(params.iter().map(to_sql_value)))?;
        Ok(changed as u64)
    }

    async fn begin(&self) -> Result<()> {
        self.conn.lock().execute_batch("BEGIN")?;
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.conn.lock().execute_batch("COMMIT")?;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.conn.lock().execute_batch("ROLLBACK")?;
        Ok(())
    }
}
