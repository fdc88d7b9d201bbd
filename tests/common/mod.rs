use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use atelier_api::auth::{CredentialVerifier, VerifiedIdentity, VerifyError};
use atelier_api::content::{ContentService, TagService};
use atelier_api::identity::{PermissionLevel, Principal, PrincipalResolver};
use atelier_api::store::{MemStore, Row, Store};

pub const ADMIN_TOKEN: &str = "token-admin";
pub const AUTHOR_TOKEN: &str = "token-author";
pub const READER_TOKEN: &str = "token-reader";
pub const SUBSCRIBER_TOKEN: &str = "token-subscriber";
/// Verifies fine upstream but has no members row locally.
pub const UNKNOWN_IDENTITY_TOKEN: &str = "token-ghost";

/// Test double for the external credential provider: a fixed token-to-subject
/// table instead of JWT decoding.
pub struct StaticVerifier {
    identities: HashMap<String, String>,
}

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, bearer_token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.identities
            .get(bearer_token)
            .cloned()
            .map(|identity_id| VerifiedIdentity { identity_id })
            .ok_or_else(|| VerifyError::InvalidToken("unknown token".to_string()))
    }
}

pub struct TestBackend {
    pub store: Arc<MemStore>,
    pub resolver: PrincipalResolver,
    pub content: ContentService,
    pub tags: TagService,
    pub admin: Principal,
    pub author: Principal,
    pub reader: Principal,
    pub subscriber: Principal,
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("JSON object")
}

pub fn id_of(value: &Value) -> Uuid {
    value["id"]
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("row id")
}

fn member_row(id: Uuid, identity: &str, role: &str, is_subscriber: bool) -> Row {
    row(json!({
        "id": id,
        "identity_id": identity,
        "display_name": format!("Test {}", role),
        "role": role,
        "is_subscriber": is_subscriber,
    }))
}

/// Seeded in-memory backend with the same unique indexes the Postgres schema
/// carries, so conflict-retry paths behave like production.
pub async fn backend() -> TestBackend {
    let store = Arc::new(
        MemStore::new()
            .with_unique_index("members", &["identity_id"], false)
            .with_unique_index("tags", &["name"], true)
            .with_unique_index("articles", &["slug"], false)
            .with_unique_index("courses", &["slug"], false)
            .with_unique_index("projects", &["slug"], false)
            .with_unique_index("modules", &["course_id", "slug"], false)
            .with_unique_index("lessons", &["module_id", "slug"], false),
    );

    let admin_id = Uuid::new_v4();
    let author_id = Uuid::new_v4();
    let reader_id = Uuid::new_v4();
    let subscriber_id = Uuid::new_v4();

    store
        .seed(
            "members",
            vec![
                member_row(admin_id, "idp|admin", "admin", true),
                member_row(author_id, "idp|author", "author", false),
                member_row(reader_id, "idp|reader", "guest", false),
                member_row(subscriber_id, "idp|subscriber", "guest", true),
            ],
        )
        .await;

    let verifier = Arc::new(StaticVerifier {
        identities: HashMap::from([
            (ADMIN_TOKEN.to_string(), "idp|admin".to_string()),
            (AUTHOR_TOKEN.to_string(), "idp|author".to_string()),
            (READER_TOKEN.to_string(), "idp|reader".to_string()),
            (SUBSCRIBER_TOKEN.to_string(), "idp|subscriber".to_string()),
            (UNKNOWN_IDENTITY_TOKEN.to_string(), "idp|ghost".to_string()),
        ]),
    });

    let store_dyn: Arc<dyn Store> = store.clone();
    TestBackend {
        resolver: PrincipalResolver::new(store_dyn.clone(), verifier),
        content: ContentService::new(store_dyn.clone()),
        tags: TagService::new(store_dyn),
        store,
        admin: Principal {
            member_id: admin_id,
            level: PermissionLevel::Admin,
            is_subscriber: true,
        },
        author: Principal {
            member_id: author_id,
            level: PermissionLevel::Author,
            is_subscriber: false,
        },
        reader: Principal {
            member_id: reader_id,
            level: PermissionLevel::Guest,
            is_subscriber: false,
        },
        subscriber: Principal {
            member_id: subscriber_id,
            level: PermissionLevel::Guest,
            is_subscriber: true,
        },
    }
}
