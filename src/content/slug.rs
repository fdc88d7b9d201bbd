use uuid::Uuid;

use crate::store::{Filter, Store, StoreError};

/// Slug used when normalization strips a candidate down to nothing.
pub const FALLBACK_SLUG: &str = "untitled";

/// Normalize a free-form candidate into a lowercase hyphenated slug:
/// trim, lowercase, whitespace runs become `-`, anything outside
/// `[a-z0-9-]` is stripped, repeated `-` collapse, leading/trailing `-`
/// are trimmed.
pub fn slugify(candidate: &str) -> String {
    let mut slug = String::with_capacity(candidate.len());
    let mut pending_hyphen = false;

    for c in candidate.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_hyphen = true;
        }
        // everything else is stripped
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Scope within which a slug must be unique: a whole table, or a table
/// restricted to one parent row (modules within a course, lessons within a
/// module).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    table: String,
    parent: Option<(String, Uuid)>,
}

impl Namespace {
    pub fn global(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            parent: None,
        }
    }

    pub fn scoped(table: impl Into<String>, parent_column: impl Into<String>, parent_id: Uuid) -> Self {
        Self {
            table: table.into(),
            parent: Some((parent_column.into(), parent_id)),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Parent column and id for scoped namespaces; creation paths persist
    /// this on the new row.
    pub fn parent(&self) -> Option<(&str, Uuid)> {
        self.parent.as_ref().map(|(c, id)| (c.as_str(), *id))
    }

    fn probe_filter(&self, slug: &str) -> Filter {
        let mut filter = Filter::new().eq("slug", slug).columns(["id"]);
        if let Some((column, id)) = &self.parent {
            filter = filter.eq(column.as_str(), *id);
        }
        filter
    }
}

/// Allocates collision-free slugs by probing the namespace and appending an
/// incrementing suffix. Probe-then-insert is not atomic; creation paths back
/// this up by retrying once on a unique-index violation.
pub struct SlugAllocator<'a> {
    store: &'a dyn Store,
}

impl<'a> SlugAllocator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub async fn allocate(&self, candidate: &str, namespace: &Namespace) -> Result<String, StoreError> {
        let base = slugify(candidate);
        let mut slug = base.clone();
        let mut suffix: u32 = 0;

        loop {
            let taken = self
                .store
                .select_one(namespace.table(), &namespace.probe_filter(&slug))
                .await?
                .is_some();
            if !taken {
                return Ok(slug);
            }
            suffix += 1;
            slug = format!("{}-{}", base, suffix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_normalizes() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Rust &   Tokio  "), "rust-tokio");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("Getting Started -- Part 2"), "getting-started-part-2");
        assert_eq!(slugify("--Trimmed--"), "trimmed");
    }

    #[test]
    fn slugify_falls_back_on_empty_result() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("   "), FALLBACK_SLUG);
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
    }

    #[test]
    fn namespaces_compare_by_scope() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Namespace::global("articles"), Namespace::global("articles"));
        assert_ne!(
            Namespace::scoped("modules", "course_id", a),
            Namespace::scoped("modules", "course_id", b)
        );
    }
}
