use std::sync::Arc;

use chrono::Utc;
use futures::future;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::content::slug::{Namespace, SlugAllocator};
use crate::content::tags::{
    JunctionTable, TagError, TagService, ARTICLE_TAGS, COURSE_TAGS, LESSON_TAGS, PROJECT_TAGS,
};
use crate::identity::{PermissionLevel, Principal};
use crate::policy::{resolve_access, ContentMeta, Decision, PreviewReason};
use crate::store::{Filter, Row, Store, StoreError};

/// A content table together with its tag junction.
#[derive(Debug, Clone, Copy)]
pub struct ContentKind {
    pub table: &'static str,
    pub junction: &'static JunctionTable,
}

pub const ARTICLES: ContentKind = ContentKind {
    table: "articles",
    junction: &ARTICLE_TAGS,
};
pub const COURSES: ContentKind = ContentKind {
    table: "courses",
    junction: &COURSE_TAGS,
};
pub const PROJECTS: ContentKind = ContentKind {
    table: "projects",
    junction: &PROJECT_TAGS,
};
pub const LESSONS: ContentKind = ContentKind {
    table: "lessons",
    junction: &LESSON_TAGS,
};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Content not found")]
    NotFound,

    #[error("You do not have access to modify this content")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Tags(#[from] TagError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
pub struct NewContent {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct NewModule {
    pub title: String,
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewLesson {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Partial update. Absent fields are left untouched; `tags: []` clears the
/// association set while an absent `tags` leaves it alone. Slugs are never
/// regenerated on update.
#[derive(Debug, Default, Deserialize)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub is_paid: Option<bool>,
    pub published: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// What a caller is allowed to see of one content row.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentView {
    Full(Value),
    Preview { item: Value, reason: PreviewReason },
}

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn row_id(row: &Row) -> Result<Uuid, ContentError> {
    row.get("id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ContentError::Store(StoreError::QueryError("row missing id".to_string())))
}

fn content_meta(row: &Row) -> Result<ContentMeta, ContentError> {
    serde_json::from_value(Value::Object(row.clone())).map_err(|e| {
        ContentError::Store(StoreError::QueryError(format!("malformed content row: {}", e)))
    })
}

fn with_tags(row: Row, tags: Vec<crate::content::tags::Tag>) -> Value {
    let mut value = Value::Object(row);
    value["tags"] = json!(tags);
    value
}

const PREVIEW_FIELDS: [&str; 6] = ["id", "slug", "title", "summary", "is_paid", "published"];

/// Reduced, non-sensitive projection for callers without full access.
fn preview_projection(row: &Row) -> Value {
    let mut out = Row::new();
    for field in PREVIEW_FIELDS {
        if let Some(value) = row.get(field) {
            out.insert(field.to_string(), value.clone());
        }
    }
    out.insert("preview".to_string(), Value::Bool(true));
    Value::Object(out)
}

/// Orchestrates content CRUD over the store: slug allocation, visibility
/// projection, and tag reconciliation.
pub struct ContentService {
    store: Arc<dyn Store>,
    tags: TagService,
}

impl ContentService {
    /// Extra allocate-then-insert rounds after a unique-index violation.
    const SLUG_INSERT_RETRIES: u32 = 2;

    pub fn new(store: Arc<dyn Store>) -> Self {
        let tags = TagService::new(store.clone());
        Self { store, tags }
    }

    pub async fn create(
        &self,
        kind: ContentKind,
        owner: &Principal,
        input: NewContent,
    ) -> Result<Value, ContentError> {
        let title = non_empty_title(&input.title)?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = object(json!({
            "id": id,
            "owner_id": owner.member_id,
            "title": title.as_str(),
            "summary": input.summary,
            "body": input.body,
            "is_paid": input.is_paid,
            "published": input.published,
            "created_at": now,
            "updated_at": now,
        }));

        let namespace = Namespace::global(kind.table);
        let inserted = self
            .insert_with_slug_retry(kind.table, &namespace, &title, row)
            .await?;

        let tag_list = match &input.tags {
            Some(names) => {
                let tag_ids = self.tags.reconcile(kind.junction, id, names).await?;
                self.tags.project(&tag_ids).await?
            }
            None => Vec::new(),
        };
        Ok(with_tags(inserted, tag_list))
    }

    pub async fn detail(
        &self,
        kind: ContentKind,
        principal: Option<&Principal>,
        slug: &str,
    ) -> Result<ContentView, ContentError> {
        let row = self
            .store
            .select_one(kind.table, &Filter::new().eq("slug", slug))
            .await?
            .ok_or(ContentError::NotFound)?;
        let meta = content_meta(&row)?;

        match resolve_access(principal, &meta) {
            Decision::NotFound => Err(ContentError::NotFound),
            Decision::PreviewOnly(reason) => Ok(ContentView::Preview {
                item: preview_projection(&row),
                reason,
            }),
            Decision::Full => {
                let tags = self.tags.tags_for(kind.junction, row_id(&row)?).await?;
                Ok(ContentView::Full(with_tags(row, tags)))
            }
        }
    }

    /// List with per-row visibility: invisible rows are dropped, paid rows
    /// the caller cannot fully read are reduced to the preview projection.
    /// Tag projections for visible rows are independent reads and fan out
    /// concurrently.
    pub async fn list(
        &self,
        kind: ContentKind,
        principal: Option<&Principal>,
    ) -> Result<Vec<Value>, ContentError> {
        let rows = self.store.select(kind.table, &Filter::new()).await?;

        let mut visible = Vec::new();
        for row in rows {
            let meta = content_meta(&row)?;
            match resolve_access(principal, &meta) {
                Decision::NotFound => {}
                Decision::Full => visible.push((row, true)),
                Decision::PreviewOnly(_) => visible.push((row, false)),
            }
        }

        let tags = &self.tags;
        future::try_join_all(visible.into_iter().map(|(row, full)| async move {
            if !full {
                return Ok::<Value, ContentError>(preview_projection(&row));
            }
            let tag_list = tags.tags_for(kind.junction, row_id(&row)?).await?;
            Ok(with_tags(row, tag_list))
        }))
        .await
    }

    pub async fn update(
        &self,
        kind: ContentKind,
        principal: &Principal,
        id: Uuid,
        patch: ContentPatch,
    ) -> Result<Value, ContentError> {
        let row = self
            .store
            .select_one(kind.table, &Filter::new().eq("id", id))
            .await?
            .ok_or(ContentError::NotFound)?;
        self.ensure_can_modify(principal, &content_meta(&row)?)?;

        let mut db_patch = Row::new();
        if let Some(title) = &patch.title {
            let title = non_empty_title(title)?;
            db_patch.insert("title".to_string(), Value::String(title));
        }
        if let Some(summary) = &patch.summary {
            db_patch.insert("summary".to_string(), Value::String(summary.clone()));
        }
        if let Some(body) = &patch.body {
            db_patch.insert("body".to_string(), Value::String(body.clone()));
        }
        if let Some(is_paid) = patch.is_paid {
            db_patch.insert("is_paid".to_string(), Value::Bool(is_paid));
        }
        if let Some(published) = patch.published {
            db_patch.insert("published".to_string(), Value::Bool(published));
        }
        db_patch.insert("updated_at".to_string(), json!(Utc::now()));

        let updated = self
            .store
            .update(kind.table, &Filter::new().eq("id", id), db_patch)
            .await?;

        if let Some(names) = &patch.tags {
            self.tags.reconcile(kind.junction, id, names).await?;
        }
        let tags = self.tags.tags_for(kind.junction, id).await?;
        Ok(with_tags(updated, tags))
    }

    /// Remove a content row, clearing its tag associations first so an
    /// abort mid-sequence never leaves dangling junction rows.
    pub async fn delete(
        &self,
        kind: ContentKind,
        principal: &Principal,
        id: Uuid,
    ) -> Result<(), ContentError> {
        let row = self
            .store
            .select_one(kind.table, &Filter::new().eq("id", id))
            .await?
            .ok_or(ContentError::NotFound)?;
        self.ensure_can_modify(principal, &content_meta(&row)?)?;

        self.store
            .delete(
                kind.junction.table,
                &Filter::new().eq(kind.junction.content_column, id),
            )
            .await?;
        let removed = self
            .store
            .delete(kind.table, &Filter::new().eq("id", id))
            .await?;
        if removed == 0 {
            return Err(ContentError::NotFound);
        }
        Ok(())
    }

    /// Add a module to a course; the slug is unique within that course only.
    pub async fn create_module(
        &self,
        principal: &Principal,
        course_id: Uuid,
        input: NewModule,
    ) -> Result<Value, ContentError> {
        let course = self
            .store
            .select_one("courses", &Filter::new().eq("id", course_id))
            .await?
            .ok_or(ContentError::NotFound)?;
        self.ensure_can_modify(principal, &content_meta(&course)?)?;

        let title = non_empty_title(&input.title)?;
        let now = Utc::now();
        let row = object(json!({
            "id": Uuid::new_v4(),
            "course_id": course_id,
            "title": title.as_str(),
            "position": input.position,
            "created_at": now,
            "updated_at": now,
        }));
        let namespace = Namespace::scoped("modules", "course_id", course_id);
        let inserted = self
            .insert_with_slug_retry("modules", &namespace, &title, row)
            .await?;
        Ok(Value::Object(inserted))
    }

    /// Add a lesson to a module; the slug is unique within that module only.
    /// Modification rights follow the parent course.
    pub async fn create_lesson(
        &self,
        principal: &Principal,
        module_id: Uuid,
        input: NewLesson,
    ) -> Result<Value, ContentError> {
        let module = self
            .store
            .select_one("modules", &Filter::new().eq("id", module_id))
            .await?
            .ok_or(ContentError::NotFound)?;
        let course_id = module
            .get("course_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| {
                ContentError::Store(StoreError::QueryError(
                    "module row missing course_id".to_string(),
                ))
            })?;
        let course = self
            .store
            .select_one("courses", &Filter::new().eq("id", course_id))
            .await?
            .ok_or(ContentError::NotFound)?;
        self.ensure_can_modify(principal, &content_meta(&course)?)?;

        let title = non_empty_title(&input.title)?;
        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = object(json!({
            "id": id,
            "module_id": module_id,
            "owner_id": principal.member_id,
            "title": title.as_str(),
            "body": input.body,
            "is_paid": input.is_paid,
            "published": input.published,
            "position": input.position,
            "created_at": now,
            "updated_at": now,
        }));
        let namespace = Namespace::scoped("lessons", "module_id", module_id);
        let inserted = self
            .insert_with_slug_retry("lessons", &namespace, &title, row)
            .await?;

        let tag_list = match &input.tags {
            Some(names) => {
                let tag_ids = self.tags.reconcile(&LESSON_TAGS, id, names).await?;
                self.tags.project(&tag_ids).await?
            }
            None => Vec::new(),
        };
        Ok(with_tags(inserted, tag_list))
    }

    /// Allocate a slug and insert, retrying a bounded number of times when a
    /// concurrent creation wins the same slug. The unique index on the
    /// namespace is the backstop the probe loop cannot provide.
    async fn insert_with_slug_retry(
        &self,
        table: &str,
        namespace: &Namespace,
        candidate: &str,
        mut row: Row,
    ) -> Result<Row, ContentError> {
        let allocator = SlugAllocator::new(self.store.as_ref());
        let mut attempts: u32 = 0;
        loop {
            let slug = allocator.allocate(candidate, namespace).await?;
            row.insert("slug".to_string(), Value::String(slug));
            match self.store.insert(table, row.clone()).await {
                Ok(inserted) => return Ok(inserted),
                Err(StoreError::UniqueViolation(_)) if attempts < Self::SLUG_INSERT_RETRIES => {
                    attempts += 1;
                }
                Err(StoreError::UniqueViolation(_)) => {
                    return Err(ContentError::Conflict(format!(
                        "could not allocate a unique slug for '{}'",
                        candidate
                    )));
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    fn ensure_can_modify(
        &self,
        principal: &Principal,
        meta: &ContentMeta,
    ) -> Result<(), ContentError> {
        if principal.level >= PermissionLevel::Admin || principal.member_id == meta.owner_id {
            Ok(())
        } else {
            Err(ContentError::Forbidden)
        }
    }
}

fn non_empty_title(title: &str) -> Result<String, ContentError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ContentError::Validation("title must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}
