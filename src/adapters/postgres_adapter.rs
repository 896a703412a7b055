//! PostgreSQL fundamentals store.

use crate::adapters::schema::{create_table_sql, line_item_columns, parse_store_date};
use crate::domain::error::DashboardError;
use crate::domain::statement::{StatementKind, StatementRow};
use crate::ports::config_port::ConfigPort;
use crate::ports::fundamentals_port::FundamentalsPort;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

pub struct PostgresAdapter {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, DashboardError> {
        let conninfo = config
            .get_string("postgres", "conninfo")
            .ok_or_else(|| DashboardError::ConfigMissing {
                section: "postgres".into(),
                key: "conninfo".into(),
            })?;

        let pg_config: postgres::Config =
            conninfo.parse().map_err(|e: postgres::Error| DashboardError::ConfigInvalid {
                section: "postgres".into(),
                key: "conninfo".into(),
                reason: e.to_string(),
            })?;

        let pool_size = config.get_int("postgres", "pool_size", 4) as u32;
        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| DashboardError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn connection(
        &self,
    ) -> Result<r2d2::PooledConnection<PostgresConnectionManager<NoTls>>, DashboardError> {
        self.pool.get().map_err(|e: r2d2::Error| DashboardError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), DashboardError> {
        let mut conn = self.connection()?;
        let ddl: Vec<String> = StatementKind::ALL
            .into_iter()
            .map(|kind| create_table_sql(kind, "DOUBLE PRECISION"))
            .collect();
        conn.batch_execute(&ddl.join(";\n"))
            .map_err(|e| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })
    }
}

/// Line items are cast so DECIMAL and integer columns read uniformly.
fn select_sql(kind: StatementKind) -> String {
    let items: Vec<String> = line_item_columns(kind)
        .iter()
        .map(|c| format!("{c}::double precision"))
        .collect();
    format!(
        "SELECT act_symbol, date::text, period, {} FROM {} WHERE act_symbol = $1 ORDER BY date DESC",
        items.join(", "),
        kind.table_name()
    )
}

impl FundamentalsPort for PostgresAdapter {
    fn fetch_statement(
        &self,
        symbol: &str,
        kind: StatementKind,
    ) -> Result<Vec<StatementRow>, DashboardError> {
        let symbol = symbol.to_uppercase();
        let rows = self
            .connection()?
            .query(select_sql(kind).as_str(), &[&symbol])
            .map_err(|e| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let columns = line_item_columns(kind);
        let mut statements = Vec::with_capacity(rows.len());
        for row in rows {
            let act_symbol: String = row.get(0);
            let date_text: String = row.get(1);
            let period: Option<String> = row.get(2);
            let Some(date) = parse_store_date(&date_text) else {
                tracing::warn!(symbol = %act_symbol, date = %date_text, "skipping row with unreadable date");
                continue;
            };
            let mut statement = StatementRow::new(&act_symbol, date, period.as_deref());
            for (i, name) in columns.iter().enumerate() {
                let value: Option<f64> = row.get(i + 3);
                statement.push_item(name, value);
            }
            statements.push(statement);
        }

        Ok(statements)
    }

    fn list_symbols(&self) -> Result<Vec<String>, DashboardError> {
        let query = "SELECT DISTINCT act_symbol FROM income_statement ORDER BY act_symbol";

        let rows = self
            .connection()?
            .query(query, &[])
            .map_err(|e| DashboardError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }
}
