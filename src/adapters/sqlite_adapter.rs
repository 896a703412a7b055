//! SQLite fundamentals store.

use crate::adapters::schema::{create_table_sql, parse_store_date};
use crate::domain::error::DashboardError;
use crate::domain::format::parse_number;
use crate::domain::statement::{StatementKind, StatementRow};
use crate::ports::config_port::ConfigPort;
use crate::ports::fundamentals_port::FundamentalsPort;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use rusqlite::types::{Value, ValueRef};
use std::collections::HashSet;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn cell_as_f64(value: ValueRef<'_>) -> Option<f64> {
    match value {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => std::str::from_utf8(t).ok().and_then(parse_number),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn cell_as_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(t) => std::str::from_utf8(t).ok().map(str::to_string),
        ValueRef::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DashboardError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| DashboardError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| DashboardError::Database {
                    reason: e.to_string(),
                })?;

        tracing::debug!(path = %db_path, pool_size, "opened sqlite store");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, DashboardError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| DashboardError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn connection(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, DashboardError> {
        self.pool.get().map_err(|e: r2d2::Error| DashboardError::Database {
            reason: e.to_string(),
        })
    }

    /// Creates the five statement tables and their symbol indexes.
    pub fn initialize_schema(&self) -> Result<(), DashboardError> {
        let conn = self.connection()?;

        let mut ddl = String::new();
        for kind in StatementKind::ALL {
            ddl.push_str(&create_table_sql(kind, "REAL"));
            ddl.push_str(";\n");
            ddl.push_str(&format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_symbol ON {table}(act_symbol);\n",
                table = kind.table_name()
            ));
        }

        conn.execute_batch(&ddl)
            .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn table_columns(
        conn: &rusqlite::Connection,
        kind: StatementKind,
    ) -> Result<HashSet<String>, DashboardError> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", kind.table_name()))
            .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?
            .collect::<Result<HashSet<String>, _>>()
            .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        Ok(names)
    }

    /// Upserts rows into one statement table. Line items without a matching
    /// column are dropped. Returns the number of rows written.
    pub fn insert_rows(
        &self,
        kind: StatementKind,
        rows: &[StatementRow],
    ) -> Result<usize, DashboardError> {
        let mut conn = self.connection()?;
        let columns = Self::table_columns(&conn, kind)?;

        let tx =
            conn.transaction()
                .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let mut skipped: HashSet<&str> = HashSet::new();
        for row in rows {
            let mut names = vec!["act_symbol", "date", "period"];
            let mut values: Vec<Value> = vec![
                Value::Text(row.symbol.clone()),
                Value::Text(row.date.format("%Y-%m-%d").to_string()),
                Value::Text(row.period.clone().unwrap_or_else(|| "Year".to_string())),
            ];
            for (name, value) in &row.items {
                if !columns.contains(name) {
                    skipped.insert(name.as_str());
                    continue;
                }
                names.push(name.as_str());
                values.push(match value {
                    Some(v) if v.is_finite() => Value::Real(*v),
                    _ => Value::Null,
                });
            }

            let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
                kind.table_name(),
                names.join(", "),
                placeholders.join(", ")
            );
            tx.execute(&sql, rusqlite::params_from_iter(values.iter()))
                .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        if !skipped.is_empty() {
            tracing::debug!(table = kind.table_name(), ?skipped, "dropped unknown columns");
        }
        Ok(rows.len())
    }
}

impl FundamentalsPort for SqliteAdapter {
    fn fetch_statement(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError> {
        let conn = self.connection()?;

        let query = format!(
            "SELECT * FROM {} WHERE act_symbol = ?1 ORDER BY date DESC",
            kind.table_name()
        );

        let mut stmt =
            conn.prepare(&query)
                .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params![symbol.to_uppercase()], |row| {
                let mut date = None;
                let mut period = None;
                let mut act_symbol = String::new();
                let mut items = Vec::with_capacity(names.len());
                for (i, name) in names.iter().enumerate() {
                    let value = row.get_ref(i)?;
                    match name.as_str() {
                        "act_symbol" => act_symbol = cell_as_string(value).unwrap_or_default(),
                        "date" => date = cell_as_string(value),
                        "period" => period = cell_as_string(value),
                        _ => items.push((name.clone(), cell_as_f64(value))),
                    }
                }
                Ok((act_symbol, date, period, items))
            })
            .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut statements = Vec::new();
        for row in rows {
            let (act_symbol, date, period, items) =
                row.map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                    reason: e.to_string(),
                })?;
            let Some(date) = date.as_deref().and_then(parse_store_date) else {
                tracing::warn!(symbol = %act_symbol, table = kind.table_name(), "skipping row with unreadable date");
                continue;
            };
            let mut statement = StatementRow::new(&act_symbol, date, period.as_deref());
            for (name, value) in items {
                statement.push_item(&name, value);
            }
            statements.push(statement);
        }

        Ok(statements)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
        let conn = self.connection()?;

        let query = "SELECT DISTINCT act_symbol FROM income_statement ORDER BY act_symbol";

        let mut stmt =
            conn.prepare(query)
                .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut symbols = Vec::new();
        for row in rows {
            symbols.push(
                row.map_err(|e: rusqlite::Error| DashboardError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(symbols)
    }
}
