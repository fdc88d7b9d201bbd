use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::CredentialVerifier;
use crate::identity::{AuthError, PermissionLevel, Principal};
use crate::store::{Filter, Store, StoreError};

/// The columns the resolver is allowed to read. Resolution stays cheap and
/// side-effect-free: nothing beyond the permission level and subscription
/// flag leaves the members table here.
const MEMBER_COLUMNS: [&str; 3] = ["id", "role", "is_subscriber"];

#[derive(Debug, Deserialize)]
struct MemberRow {
    id: Uuid,
    role: String,
    is_subscriber: bool,
}

/// Resolves an opaque bearer credential into a request `Principal`.
pub struct PrincipalResolver {
    store: Arc<dyn Store>,
    verifier: Arc<dyn CredentialVerifier>,
}

impl PrincipalResolver {
    pub fn new(store: Arc<dyn Store>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Strict resolution: any failure propagates. A missing credential is not
    /// a failure; it resolves to an anonymous `None`.
    pub async fn resolve(&self, bearer: Option<&str>) -> Result<Option<Principal>, AuthError> {
        let Some(token) = bearer else {
            return Ok(None);
        };
        let identity = self.verifier.verify(token).await?;

        let filter = Filter::new()
            .eq("identity_id", identity.identity_id.as_str())
            .columns(MEMBER_COLUMNS);
        let row = self
            .store
            .select_one("members", &filter)
            .await?
            .ok_or(AuthError::ProfileNotFound(identity.identity_id))?;

        let member: MemberRow = serde_json::from_value(Value::Object(row))
            .map_err(|e| StoreError::QueryError(format!("malformed member row: {}", e)))?;

        let level = PermissionLevel::parse(&member.role).unwrap_or_else(|| {
            tracing::warn!(member_id = %member.id, role = %member.role, "Unknown member role, treating as guest");
            PermissionLevel::Guest
        });

        Ok(Some(Principal {
            member_id: member.id,
            level,
            is_subscriber: member.is_subscriber,
        }))
    }

    /// Optional resolution: an invalid credential or a missing profile
    /// degrades the request to anonymous instead of failing it. Store
    /// failures still propagate.
    pub async fn resolve_optional(&self, bearer: Option<&str>) -> Result<Option<Principal>, AuthError> {
        match self.resolve(bearer).await {
            Ok(principal) => Ok(principal),
            Err(err @ (AuthError::Unauthorized(_) | AuthError::ProfileNotFound(_))) => {
                tracing::warn!("Degrading request to anonymous: {}", err);
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }
}
