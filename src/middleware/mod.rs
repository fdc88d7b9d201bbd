pub mod auth;

pub use auth::{optional_principal, require_principal, CurrentPrincipal};
