//! Principal resolution. Every operation receives the caller explicitly;
//! nothing reads an ambient "current user".

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::profile_repo;
use crate::error::AppError;
use crate::models::profile::{Account, Role, UserProfile};
use crate::ops;
use crate::state::AppState;

/// The resolved caller: identity account plus operational profile.
#[derive(Debug, Clone)]
pub struct Principal {
    pub account: Account,
    pub profile: UserProfile,
}

impl Principal {
    pub fn is_courier(&self) -> bool {
        self.profile.role == Role::Courier
    }

    /// Coordinator or admin role. Permission checks follow the role
    /// field; the account-level admin flag only matters for courier
    /// pools and assignment targets.
    pub fn is_staff(&self) -> bool {
        matches!(self.profile.role, Role::Admin | Role::Coordinator)
    }

    pub fn is_admin(&self) -> bool {
        self.profile.role == Role::Admin
    }
}

/// Requests name an account through the `x-account` header (the
/// identity layer in front of this service is trusted to set it). The
/// account must already exist; its profile is created on first access.
#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let username = parts
            .headers
            .get("x-account")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing x-account header".to_string()))?
            .to_string();

        let account = state
            .db
            .with_conn(|conn| profile_repo::find_account_by_username(conn, &username))?
            .ok_or_else(|| AppError::Unauthorized(format!("unknown account: {username}")))?;

        if !account.active {
            return Err(AppError::Unauthorized(format!(
                "account {username} is disabled"
            )));
        }

        let profile = ops::profiles::ensure_profile(&state.db, &account)?;

        Ok(Principal { account, profile })
    }
}

/// Test-only shortcut for driving the ops layer without HTTP.
#[cfg(test)]
pub(crate) fn principal_for(account: Account, profile: UserProfile) -> Principal {
    Principal { account, profile }
}
