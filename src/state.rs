use std::sync::Arc;

use crate::auth::CredentialVerifier;
use crate::content::{ContentService, TagService};
use crate::identity::PrincipalResolver;
use crate::store::Store;

/// Process-wide handles injected at startup. There is no other global
/// configuration; every handler works from these plus its own arguments.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub resolver: Arc<PrincipalResolver>,
    pub content: Arc<ContentService>,
    pub tags: Arc<TagService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            resolver: Arc::new(PrincipalResolver::new(store.clone(), verifier)),
            content: Arc::new(ContentService::new(store.clone())),
            tags: Arc::new(TagService::new(store.clone())),
            store,
        }
    }
}
