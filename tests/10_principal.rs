mod common;

use anyhow::Result;
use atelier_api::identity::{AuthError, PermissionLevel};

#[tokio::test]
async fn missing_credential_resolves_to_anonymous() -> Result<()> {
    let backend = common::backend().await;
    assert!(backend.resolver.resolve(None).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn valid_credential_resolves_to_principal() -> Result<()> {
    let backend = common::backend().await;
    let principal = backend
        .resolver
        .resolve(Some(common::AUTHOR_TOKEN))
        .await?
        .expect("expected a principal");
    assert_eq!(principal.member_id, backend.author.member_id);
    assert_eq!(principal.level, PermissionLevel::Author);
    assert!(!principal.is_subscriber);
    Ok(())
}

#[tokio::test]
async fn subscriber_flag_survives_resolution() -> Result<()> {
    let backend = common::backend().await;
    let principal = backend
        .resolver
        .resolve(Some(common::SUBSCRIBER_TOKEN))
        .await?
        .expect("expected a principal");
    assert_eq!(principal.level, PermissionLevel::Guest);
    assert!(principal.is_subscriber);
    Ok(())
}

#[tokio::test]
async fn rejected_credential_fails_closed() -> Result<()> {
    let backend = common::backend().await;
    let err = backend
        .resolver
        .resolve(Some("garbage-token"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(_)));
    Ok(())
}

#[tokio::test]
async fn missing_profile_is_distinct_from_bad_credential() -> Result<()> {
    let backend = common::backend().await;
    let err = backend
        .resolver
        .resolve(Some(common::UNKNOWN_IDENTITY_TOKEN))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ProfileNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn optional_resolution_degrades_to_anonymous() -> Result<()> {
    let backend = common::backend().await;

    // invalid credential and missing profile both degrade
    assert!(backend
        .resolver
        .resolve_optional(Some("garbage-token"))
        .await?
        .is_none());
    assert!(backend
        .resolver
        .resolve_optional(Some(common::UNKNOWN_IDENTITY_TOKEN))
        .await?
        .is_none());

    // a valid credential still resolves through the same path
    let principal = backend
        .resolver
        .resolve_optional(Some(common::ADMIN_TOKEN))
        .await?
        .expect("expected a principal");
    assert_eq!(principal.level, PermissionLevel::Admin);
    Ok(())
}
