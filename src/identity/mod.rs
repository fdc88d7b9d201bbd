use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::VerifyError;
use crate::store::StoreError;

mod resolver;

pub use resolver::PrincipalResolver;

/// Totally ordered permission levels. Gates always compare with `>=`, so a
/// higher role satisfies every lower requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Guest = 1,
    Author = 2,
    Admin = 3,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Guest => "guest",
            PermissionLevel::Author => "author",
            PermissionLevel::Admin => "admin",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "guest" => Some(PermissionLevel::Guest),
            "author" => Some(PermissionLevel::Author),
            "admin" => Some(PermissionLevel::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The resolved caller for one request. Built from a verified credential,
/// threaded through handlers explicitly, and discarded at request end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    pub member_id: Uuid,
    pub level: PermissionLevel,
    pub is_subscriber: bool,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential rejected: {0}")]
    Unauthorized(#[from] VerifyError),

    #[error("No member profile for identity {0}")]
    ProfileNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
