use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::store::filter::{Filter, Predicate, Scalar};
use crate::store::{Row, Store, StoreError};

/// In-process store used by the test suite and local development. Tables are
/// plain row vectors; declared unique indexes surface `UniqueViolation` the
/// same way the Postgres backend does, so conflict-retry paths behave
/// identically against both backends.
pub struct MemStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    unique: Vec<UniqueIndex>,
}

struct UniqueIndex {
    table: String,
    columns: Vec<String>,
    case_insensitive: bool,
}

impl UniqueIndex {
    /// Canonical key for a row, or None when any indexed column is absent
    /// or null (nullable unique semantics).
    fn key_for(&self, row: &Row) -> Option<String> {
        let mut parts = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let value = row.get(column)?;
            if value.is_null() {
                return None;
            }
            let mut part = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if self.case_insensitive {
                part = part.to_lowercase();
            }
            parts.push(part);
        }
        Some(parts.join("\u{1f}"))
    }

    fn name(&self) -> String {
        format!("{}_{}_key", self.table, self.columns.join("_"))
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            unique: Vec::new(),
        }
    }

    pub fn with_unique_index(
        mut self,
        table: &str,
        columns: &[&str],
        case_insensitive: bool,
    ) -> Self {
        self.unique.push(UniqueIndex {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            case_insensitive,
        });
        self
    }

    pub async fn seed(&self, table: &str, rows: Vec<Row>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    fn check_unique(&self, table: &str, existing: &[Row], candidate: &Row) -> Result<(), StoreError> {
        for index in self.unique.iter().filter(|i| i.table == table) {
            let Some(key) = index.key_for(candidate) else {
                continue;
            };
            for row in existing {
                if index.key_for(row).as_deref() == Some(key.as_str()) {
                    return Err(StoreError::UniqueViolation(index.name()));
                }
            }
        }
        Ok(())
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    filter.predicates().iter().all(|predicate| match predicate {
        Predicate::Eq(column, value) => row.get(column) == Some(&value.to_value()),
        Predicate::EqCi(column, value) => match (row.get(column), value) {
            (Some(Value::String(a)), Scalar::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => false,
        },
        Predicate::In(column, values) => values
            .iter()
            .any(|v| row.get(column) == Some(&v.to_value())),
        Predicate::IsNull(column) => row.get(column).map(|v| v.is_null()).unwrap_or(true),
    })
}

fn project(row: &Row, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row.clone();
    }
    let mut out = Row::new();
    for column in columns {
        if let Some(value) = row.get(column) {
            out.insert(column.clone(), value.clone());
        }
    }
    out
}

#[async_trait]
impl Store for MemStore {
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        filter.validate()?;
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(Vec::as_slice).unwrap_or_default();
        Ok(rows
            .iter()
            .filter(|row| matches(row, filter))
            .map(|row| project(row, filter.selected_columns()))
            .collect())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        self.check_unique(table, rows, &row)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Row) -> Result<Row, StoreError> {
        filter.validate()?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        let mut first_updated = None;
        for row in rows.iter_mut().filter(|row| matches(row, filter)) {
            for (column, value) in &patch {
                row.insert(column.clone(), value.clone());
            }
            if first_updated.is_none() {
                first_updated = Some(row.clone());
            }
        }
        first_updated.ok_or_else(|| StoreError::NotFound(format!("no matching row in {}", table)))
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<u64, StoreError> {
        filter.validate()?;
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|row| !matches(row, filter));
        Ok((before - rows.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn unique_index_rejects_case_insensitive_duplicates() {
        let store = MemStore::new().with_unique_index("tags", &["name"], true);
        store
            .insert("tags", row(json!({"id": "1", "name": "Rust"})))
            .await
            .unwrap();
        let err = store
            .insert("tags", row(json!({"id": "2", "name": "rust"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn composite_index_scopes_uniqueness_to_parent() {
        let store = MemStore::new().with_unique_index("modules", &["course_id", "slug"], false);
        store
            .insert("modules", row(json!({"course_id": "a", "slug": "intro"})))
            .await
            .unwrap();
        // same slug under another parent is fine
        store
            .insert("modules", row(json!({"course_id": "b", "slug": "intro"})))
            .await
            .unwrap();
        let err = store
            .insert("modules", row(json!({"course_id": "a", "slug": "intro"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn select_applies_filter_and_projection() {
        let store = MemStore::new();
        store
            .seed(
                "articles",
                vec![
                    row(json!({"id": "1", "slug": "a", "published": true})),
                    row(json!({"id": "2", "slug": "b", "published": false})),
                ],
            )
            .await;
        let found = store
            .select(
                "articles",
                &Filter::new().eq("published", true).columns(["id"]),
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("id"), Some(&json!("1")));
        assert!(found[0].get("slug").is_none());
    }
}
