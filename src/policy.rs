// Pure decision primitives: role gates and the content visibility matrix.
// Nothing here touches the store; callers pass in already-fetched metadata.
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::identity::{PermissionLevel, Principal};

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Requires {required} access or higher")]
    InsufficientPermission { required: PermissionLevel },
}

/// Single ordinal gate for every role requirement. Returns the principal
/// unchanged so handlers can keep threading it.
pub fn require(
    principal: Option<&Principal>,
    minimum: PermissionLevel,
) -> Result<&Principal, PolicyError> {
    let principal = principal.ok_or(PolicyError::Unauthenticated)?;
    if principal.level >= minimum {
        Ok(principal)
    } else {
        Err(PolicyError::InsufficientPermission { required: minimum })
    }
}

/// Minimal projection of a content row needed for a visibility decision.
/// Read fresh from the store for every decision; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ContentMeta {
    pub owner_id: Uuid,
    pub published: bool,
    pub is_paid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewReason {
    AuthenticationRequired,
    SubscriptionRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Full,
    PreviewOnly(PreviewReason),
    NotFound,
}

/// Visibility decision table, first match wins:
/// 1. unpublished and not the owner -> NotFound (drafts do not reveal their
///    existence, not even as a 403)
/// 2. published free content -> Full for everyone
/// 3. the owner always sees their own paid content
/// 4. subscribers see paid content in full
/// 5. anonymous callers get a preview with an authentication hint
/// 6. authenticated non-subscribers get a preview with a subscription hint
pub fn resolve_access(principal: Option<&Principal>, meta: &ContentMeta) -> Decision {
    let is_owner = principal
        .map(|p| p.member_id == meta.owner_id)
        .unwrap_or(false);

    if !meta.published && !is_owner {
        return Decision::NotFound;
    }
    if !meta.is_paid {
        return Decision::Full;
    }
    if is_owner {
        return Decision::Full;
    }
    match principal {
        None => Decision::PreviewOnly(PreviewReason::AuthenticationRequired),
        Some(p) if p.is_subscriber => Decision::Full,
        Some(_) => Decision::PreviewOnly(PreviewReason::SubscriptionRequired),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(level: PermissionLevel, is_subscriber: bool) -> Principal {
        Principal {
            member_id: Uuid::new_v4(),
            level,
            is_subscriber,
        }
    }

    #[test]
    fn require_passes_equal_and_higher_levels() {
        let levels = [
            PermissionLevel::Guest,
            PermissionLevel::Author,
            PermissionLevel::Admin,
        ];
        for have in levels {
            for need in levels {
                let p = principal(have, false);
                let result = require(Some(&p), need);
                if have >= need {
                    assert_eq!(result.unwrap().level, have);
                } else {
                    assert_eq!(
                        result.unwrap_err(),
                        PolicyError::InsufficientPermission { required: need }
                    );
                }
            }
        }
    }

    #[test]
    fn require_rejects_anonymous() {
        assert_eq!(
            require(None, PermissionLevel::Guest).unwrap_err(),
            PolicyError::Unauthenticated
        );
    }

    #[test]
    fn visibility_matrix_is_total() {
        use Decision::*;
        use PreviewReason::*;

        let owner_id = Uuid::new_v4();
        let owner = Principal {
            member_id: owner_id,
            level: PermissionLevel::Author,
            is_subscriber: false,
        };
        let other = principal(PermissionLevel::Guest, false);
        let subscriber = principal(PermissionLevel::Guest, true);

        // (published, is_paid, caller, expected)
        let cases: Vec<(bool, bool, Option<&Principal>, Decision)> = vec![
            // unpublished free
            (false, false, None, NotFound),
            (false, false, Some(&other), NotFound),
            (false, false, Some(&owner), Full),
            (false, false, Some(&subscriber), NotFound),
            // unpublished paid
            (false, true, None, NotFound),
            (false, true, Some(&other), NotFound),
            (false, true, Some(&owner), Full),
            (false, true, Some(&subscriber), NotFound),
            // published free
            (true, false, None, Full),
            (true, false, Some(&other), Full),
            (true, false, Some(&owner), Full),
            (true, false, Some(&subscriber), Full),
            // published paid
            (true, true, None, PreviewOnly(AuthenticationRequired)),
            (true, true, Some(&other), PreviewOnly(SubscriptionRequired)),
            (true, true, Some(&owner), Full),
            (true, true, Some(&subscriber), Full),
        ];

        for (published, is_paid, caller, expected) in cases {
            let meta = ContentMeta {
                owner_id,
                published,
                is_paid,
            };
            assert_eq!(
                resolve_access(caller, &meta),
                expected,
                "published={} is_paid={} caller={:?}",
                published,
                is_paid,
                caller.map(|p| p.member_id)
            );
        }
    }
}
