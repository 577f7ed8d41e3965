//! Profile lifecycle: idempotent default-profile creation at principal
//! resolution, account administration, and the assignable courier pool.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::profile_repo::{self, ProfileFilter, ProfileUpdate};
use crate::db::Database;
use crate::error::AppError;
use crate::models::profile::{Account, Role, ShiftState, UserProfile};
use crate::ops::visibility;
use crate::state::AppState;

/// Get-or-create of the default profile for an account. Invoked once at
/// principal resolution; calling it twice for the same account yields
/// exactly one profile (the unique account link backstops the check).
pub fn ensure_profile(db: &Database, account: &Account) -> Result<UserProfile, AppError> {
    db.with_tx(|tx| {
        if let Some(profile) = profile_repo::find_by_account(tx, account.id)? {
            return Ok(profile);
        }

        let profile = UserProfile {
            id: Uuid::new_v4(),
            account_id: account.id,
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            is_admin: account.is_admin,
            phone: String::new(),
            role: Role::Courier,
            shift_state: ShiftState::Available,
            break_started_at: None,
            vehicle_id: None,
            photo_path: None,
            active: true,
            created_at: Utc::now(),
        };
        profile_repo::insert_profile(tx, &profile)?;

        tracing::info!(account = %account.username, "default profile created");
        Ok(profile)
    })
}

pub struct NewAccount {
    pub username: String,
    pub full_name: Option<String>,
    pub is_admin: bool,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

/// Creates an account together with its profile. Administrator only.
pub fn create_account(
    state: &AppState,
    principal: &Principal,
    input: NewAccount,
) -> Result<UserProfile, AppError> {
    if !principal.is_admin() {
        return Err(AppError::Permission(
            "only an administrator may create accounts".to_string(),
        ));
    }

    let username = input.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("username cannot be empty".to_string()));
    }

    state.db.with_tx(|tx| {
        if profile_repo::find_account_by_username(tx, &username)?.is_some() {
            return Err(AppError::Conflict(format!(
                "account {username} already exists"
            )));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: username.clone(),
            full_name: input.full_name.clone().unwrap_or_default(),
            is_admin: input.is_admin,
            active: true,
            created_at: now,
        };
        profile_repo::insert_account(tx, &account)?;

        let profile = UserProfile {
            id: Uuid::new_v4(),
            account_id: account.id,
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            is_admin: account.is_admin,
            phone: input.phone.clone().unwrap_or_default(),
            role: input.role.unwrap_or(Role::Courier),
            shift_state: ShiftState::Available,
            break_started_at: None,
            vehicle_id: None,
            photo_path: None,
            active: true,
            created_at: now,
        };
        profile_repo::insert_profile(tx, &profile)?;

        tracing::info!(account = %username, role = profile.role.as_str(), "account created");
        Ok(profile)
    })
}

pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub photo_path: Option<String>,
}

/// Administrator edit of an existing profile and its account name.
pub fn update_profile(
    state: &AppState,
    principal: &Principal,
    profile_id: Uuid,
    changes: ProfileChanges,
) -> Result<UserProfile, AppError> {
    if !principal.is_admin() {
        return Err(AppError::Permission(
            "only an administrator may edit profiles".to_string(),
        ));
    }

    state.db.with_tx(|tx| {
        let profile = profile_repo::find_by_id(tx, profile_id)?
            .ok_or_else(|| AppError::NotFound(format!("profile {profile_id} not found")))?;

        if let Some(full_name) = &changes.full_name {
            profile_repo::update_account_name(tx, profile.account_id, full_name)?;
        }
        profile_repo::update_fields(
            tx,
            profile_id,
            &ProfileUpdate {
                phone: changes.phone.as_deref(),
                role: changes.role,
                active: changes.active,
                photo_path: changes.photo_path.as_deref(),
            },
        )?;

        profile_repo::find_by_id(tx, profile_id)?
            .ok_or_else(|| AppError::Internal("profile vanished during update".to_string()))
    })
}

pub fn list_profiles(
    state: &AppState,
    principal: &Principal,
    filter: &ProfileFilter,
) -> Result<Vec<UserProfile>, AppError> {
    let scope = visibility::courier_scope(principal);
    state.db.with_conn(|conn| profile_repo::list(conn, filter, scope))
}

pub fn get_profile(
    state: &AppState,
    principal: &Principal,
    profile_id: Uuid,
) -> Result<UserProfile, AppError> {
    if let Some(own) = visibility::courier_scope(principal) {
        if own != profile_id {
            return Err(AppError::NotFound(format!("profile {profile_id} not found")));
        }
    }

    state
        .db
        .with_conn(|conn| profile_repo::find_by_id(conn, profile_id))?
        .ok_or_else(|| AppError::NotFound(format!("profile {profile_id} not found")))
}

/// Assignable couriers. Admin accounts never appear here, whatever
/// their role field says.
pub fn courier_pool(state: &AppState) -> Result<Vec<UserProfile>, AppError> {
    state.db.with_conn(profile_repo::courier_pool)
}
