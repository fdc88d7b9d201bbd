use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::store::{Filter, Row, Scalar, Store, StoreError};

/// A content-type-specific junction table between content rows and tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JunctionTable {
    pub table: &'static str,
    pub content_column: &'static str,
}

pub const ARTICLE_TAGS: JunctionTable = JunctionTable {
    table: "article_tags",
    content_column: "article_id",
};
pub const LESSON_TAGS: JunctionTable = JunctionTable {
    table: "lesson_tags",
    content_column: "lesson_id",
};
pub const PROJECT_TAGS: JunctionTable = JunctionTable {
    table: "project_tags",
    content_column: "project_id",
};
pub const COURSE_TAGS: JunctionTable = JunctionTable {
    table: "course_tags",
    content_column: "course_id",
};

/// Every junction table that may reference a tag. Cascading deletion clears
/// all of them explicitly; the schema is not assumed to cascade.
pub const TAG_JUNCTIONS: [JunctionTable; 4] =
    [ARTICLE_TAGS, LESSON_TAGS, PROJECT_TAGS, COURSE_TAGS];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("Tag not found: {0}")]
    NotFound(Uuid),

    #[error("Tag name conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn tag_from_row(row: Row) -> Result<Tag, TagError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| TagError::Store(StoreError::QueryError(format!("malformed tag row: {}", e))))
}

/// Trim, drop empties, and keep the first spelling of each
/// case-insensitively distinct name.
fn normalize_names(names: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Reconciles free-form tag labels into deduplicated `tags` rows and their
/// junction-table associations.
pub struct TagService {
    store: Arc<dyn Store>,
}

impl TagService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Full-replace reconcile for one content row: existing associations are
    /// cleared first, then names are upserted and re-associated. The
    /// destructive step runs before any insert so an abort mid-sequence
    /// leaves the row with no tags rather than duplicates.
    pub async fn reconcile(
        &self,
        junction: &JunctionTable,
        content_id: Uuid,
        names: &[String],
    ) -> Result<Vec<Uuid>, TagError> {
        self.store
            .delete(
                junction.table,
                &Filter::new().eq(junction.content_column, content_id),
            )
            .await?;

        let names = normalize_names(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut tag_ids = Vec::with_capacity(names.len());
        for name in &names {
            tag_ids.push(self.upsert_tag(name).await?);
        }

        for tag_id in &tag_ids {
            let mut row = Row::new();
            row.insert(
                junction.content_column.to_string(),
                Value::String(content_id.to_string()),
            );
            row.insert("tag_id".to_string(), Value::String(tag_id.to_string()));
            self.store.insert(junction.table, row).await?;
        }

        Ok(tag_ids)
    }

    /// Look up a tag by case-insensitive name, inserting it when new. Losing
    /// the insert race to a concurrent request is recovered by re-selecting
    /// the winner's row.
    async fn upsert_tag(&self, name: &str) -> Result<Uuid, TagError> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        let mut row = Row::new();
        row.insert("id".to_string(), Value::String(id.to_string()));
        row.insert("name".to_string(), Value::String(name.to_string()));

        match self.store.insert("tags", row).await {
            Ok(_) => Ok(id),
            Err(StoreError::UniqueViolation(_)) => self
                .find_by_name(name)
                .await?
                .map(|tag| tag.id)
                .ok_or_else(|| TagError::Conflict(name.to_string())),
            Err(other) => Err(other.into()),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tag>, TagError> {
        let row = self
            .store
            .select_one("tags", &Filter::new().eq_ci("name", name))
            .await?;
        row.map(tag_from_row).transpose()
    }

    pub async fn get(&self, id: Uuid) -> Result<Tag, TagError> {
        let row = self
            .store
            .select_one("tags", &Filter::new().eq("id", id))
            .await?
            .ok_or(TagError::NotFound(id))?;
        tag_from_row(row)
    }

    pub async fn list(&self) -> Result<Vec<Tag>, TagError> {
        let rows = self.store.select("tags", &Filter::new()).await?;
        rows.into_iter().map(tag_from_row).collect()
    }

    /// Batch projection of tag ids to full tags for response bodies.
    pub async fn project(&self, ids: &[Uuid]) -> Result<Vec<Tag>, TagError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Scalar> = ids.iter().map(|id| Scalar::from(*id)).collect();
        let rows = self
            .store
            .select("tags", &Filter::new().is_in("id", values))
            .await?;
        rows.into_iter().map(tag_from_row).collect()
    }

    /// Tags currently associated with one content row.
    pub async fn tags_for(
        &self,
        junction: &JunctionTable,
        content_id: Uuid,
    ) -> Result<Vec<Tag>, TagError> {
        let associations = self
            .store
            .select(
                junction.table,
                &Filter::new()
                    .eq(junction.content_column, content_id)
                    .columns(["tag_id"]),
            )
            .await?;
        let ids: Vec<Uuid> = associations
            .iter()
            .filter_map(|row| row.get("tag_id"))
            .filter_map(|v| v.as_str())
            .filter_map(|s| Uuid::parse_str(s).ok())
            .collect();
        self.project(&ids).await
    }

    /// Delete a tag, proactively clearing every junction table first rather
    /// than relying on a database cascade. Per-table cleanup failures are
    /// logged and skipped; only the final tag-row deletion is fatal.
    pub async fn delete_tag(&self, id: Uuid) -> Result<(), TagError> {
        // surface NotFound before touching any junction table
        self.get(id).await?;

        for junction in &TAG_JUNCTIONS {
            if let Err(err) = self
                .store
                .delete(junction.table, &Filter::new().eq("tag_id", id))
                .await
            {
                tracing::warn!(
                    table = junction.table,
                    tag_id = %id,
                    "Failed to clear tag associations: {}",
                    err
                );
            }
        }

        let removed = self
            .store
            .delete("tags", &Filter::new().eq("id", id))
            .await?;
        if removed == 0 {
            return Err(TagError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_names_case_insensitively() {
        let names = vec![
            "Go".to_string(),
            "go".to_string(),
            " Go ".to_string(),
            "".to_string(),
            "  ".to_string(),
            "Rust".to_string(),
        ];
        assert_eq!(normalize_names(&names), vec!["Go", "Rust"]);
    }

    #[test]
    fn junction_tables_cover_every_content_type() {
        let tables: Vec<&str> = TAG_JUNCTIONS.iter().map(|j| j.table).collect();
        assert_eq!(
            tables,
            ["article_tags", "lesson_tags", "project_tags", "course_tags"]
        );
    }
}
