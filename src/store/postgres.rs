use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::{PgPool, Row as _};
use tracing::info;

use crate::config;
use crate::store::filter::{self, Filter, Predicate, Scalar};
use crate::store::{Row, Store, StoreError};

/// Postgres-backed store. All SQL is built from validated identifiers and
/// bound parameters; payload rows go through `jsonb_populate_record` so the
/// database performs the JSON-to-column conversions.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connect using DATABASE_URL and the configured pool settings.
    pub async fn connect() -> Result<Self, StoreError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::QueryError("DATABASE_URL is not set".to_string()))?;
        let db = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .acquire_timeout(Duration::from_secs(db.connection_timeout))
            .connect(&url)
            .await?;
        info!("Created database pool");
        Ok(Self::new(pool))
    }
}

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            return StoreError::UniqueViolation(constraint);
        }
    }
    StoreError::Sqlx(err)
}

/// Render the filter as a WHERE clause starting at parameter `$start`.
/// Returns the clause (empty when there are no predicates) and the
/// parameters to bind, in order.
fn render_where(filter: &Filter, start: usize, qualifier: Option<&str>) -> (String, Vec<Scalar>) {
    let qualify = |column: &str| match qualifier {
        Some(table) => format!("\"{}\".\"{}\"", table, column),
        None => format!("\"{}\"", column),
    };

    let mut parts = Vec::new();
    let mut params = Vec::new();
    let mut n = start;

    for predicate in filter.predicates() {
        match predicate {
            Predicate::Eq(column, value) => {
                parts.push(format!("{} = ${}", qualify(column), n));
                params.push(value.clone());
                n += 1;
            }
            Predicate::EqCi(column, value) => {
                parts.push(format!("LOWER({}) = LOWER(${})", qualify(column), n));
                params.push(value.clone());
                n += 1;
            }
            Predicate::In(column, values) => {
                if values.is_empty() {
                    parts.push("FALSE".to_string());
                } else {
                    let placeholders: Vec<String> =
                        (0..values.len()).map(|i| format!("${}", n + i)).collect();
                    parts.push(format!(
                        "{} IN ({})",
                        qualify(column),
                        placeholders.join(", ")
                    ));
                    params.extend(values.iter().cloned());
                    n += values.len();
                }
            }
            Predicate::IsNull(column) => {
                parts.push(format!("{} IS NULL", qualify(column)));
            }
        }
    }

    (parts.join(" AND "), params)
}

fn bind_scalar<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    scalar: &'q Scalar,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match scalar {
        Scalar::Uuid(u) => query.bind(*u),
        Scalar::Text(s) => query.bind(s.as_str()),
        Scalar::Bool(b) => query.bind(*b),
        Scalar::Int(i) => query.bind(*i),
    }
}

fn row_from_pg(pg_row: &sqlx::postgres::PgRow) -> Result<Row, StoreError> {
    let value: Value = pg_row
        .try_get("row")
        .map_err(|e| StoreError::QueryError(format!("row marshalling failed: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::QueryError(format!(
            "expected JSON object row, got {}",
            other
        ))),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        filter::validate_table(table)?;
        filter.validate()?;

        let projection = if filter.selected_columns().is_empty() {
            "*".to_string()
        } else {
            filter
                .selected_columns()
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let (where_sql, params) = render_where(filter, 1, None);
        let inner = if where_sql.is_empty() {
            format!("SELECT {} FROM \"{}\"", projection, table)
        } else {
            format!("SELECT {} FROM \"{}\" WHERE {}", projection, table, where_sql)
        };
        let sql = format!("SELECT to_jsonb(t) AS row FROM ({}) t", inner);

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = bind_scalar(query, param);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_err)?;
        rows.iter().map(row_from_pg).collect()
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        filter::validate_table(table)?;

        let sql = format!(
            "INSERT INTO \"{table}\" SELECT * FROM jsonb_populate_record(NULL::\"{table}\", $1) \
             RETURNING to_jsonb(\"{table}\") AS row",
            table = table
        );
        let inserted = sqlx::query(&sql)
            .bind(Value::Object(row))
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row_from_pg(&inserted)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Row, StoreError> {
        filter::validate_table(table)?;
        filter.validate()?;
        if patch.is_empty() {
            return Err(StoreError::QueryError("empty update patch".to_string()));
        }
        for column in patch.keys() {
            filter::validate_column(column)?;
        }

        let assignments = patch
            .keys()
            .map(|c| format!("\"{0}\" = rec.\"{0}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let (where_sql, params) = render_where(filter, 2, Some(table));
        let where_clause = if where_sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", where_sql)
        };
        let sql = format!(
            "UPDATE \"{table}\" SET {assignments} \
             FROM jsonb_populate_record(NULL::\"{table}\", $1) AS rec{where_clause} \
             RETURNING to_jsonb(\"{table}\") AS row",
            table = table,
            assignments = assignments,
            where_clause = where_clause
        );

        let mut query = sqlx::query(&sql).bind(Value::Object(patch));
        for param in &params {
            query = bind_scalar(query, param);
        }
        let updated = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?
            .ok_or_else(|| StoreError::NotFound(format!("no matching row in {}", table)))?;
        row_from_pg(&updated)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, StoreError> {
        filter::validate_table(table)?;
        filter.validate()?;

        let (where_sql, params) = render_where(filter, 1, None);
        let sql = if where_sql.is_empty() {
            format!("DELETE FROM \"{}\"", table)
        } else {
            format!("DELETE FROM \"{}\" WHERE {}", table, where_sql)
        };

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = bind_scalar(query, param);
        }
        let result = query.execute(&self.pool).await.map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn renders_where_with_incrementing_params() {
        let id = Uuid::new_v4();
        let filter = Filter::new().eq("id", id).eq_ci("name", "Rust");
        let (sql, params) = render_where(&filter, 1, None);
        assert_eq!(sql, "\"id\" = $1 AND LOWER(\"name\") = LOWER($2)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn renders_in_with_placeholders() {
        let ids: Vec<Scalar> = vec![Uuid::new_v4().into(), Uuid::new_v4().into()];
        let filter = Filter::new().is_in("id", ids);
        let (sql, params) = render_where(&filter, 2, Some("tags"));
        assert_eq!(sql, "\"tags\".\"id\" IN ($2, $3)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn renders_empty_in_as_false() {
        let filter = Filter::new().is_in("id", vec![]);
        let (sql, params) = render_where(&filter, 1, None);
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());
    }
}
