//! Accounts and user profiles. Profiles always load with their account
//! row joined in; the vehicle link lives on the profile side only, and
//! the reverse (vehicle → holder) is computed here by lookup.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{bad_enum, now_text, parse_opt_ts, parse_opt_uuid, parse_ts, parse_uuid};
use crate::error::AppError;
use crate::models::profile::{Account, Role, ShiftState, UserProfile};

const PROFILE_COLUMNS: &str = "p.id, p.account_id, a.username, a.full_name, a.is_admin, \
     p.phone, p.role, p.shift_state, p.break_started_at, p.vehicle_id, p.photo_path, \
     p.active, p.created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        is_admin: row.get("is_admin")?,
        active: row.get("active")?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    let role: String = row.get("role")?;
    let shift_state: String = row.get("shift_state")?;

    Ok(UserProfile {
        id: parse_uuid(&row.get::<_, String>("id")?)?,
        account_id: parse_uuid(&row.get::<_, String>("account_id")?)?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        is_admin: row.get("is_admin")?,
        phone: row.get("phone")?,
        role: Role::parse(&role).ok_or_else(|| bad_enum("role", &role))?,
        shift_state: ShiftState::parse(&shift_state)
            .ok_or_else(|| bad_enum("shift_state", &shift_state))?,
        break_started_at: parse_opt_ts(row.get("break_started_at")?)?,
        vehicle_id: parse_opt_uuid(row.get("vehicle_id")?)?,
        photo_path: row.get("photo_path")?,
        active: row.get("active")?,
        created_at: parse_ts(&row.get::<_, String>("created_at")?)?,
    })
}

pub fn insert_account(conn: &Connection, account: &Account) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO accounts (id, username, full_name, is_admin, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            account.id.to_string(),
            account.username,
            account.full_name,
            account.is_admin,
            account.active,
            now_text(account.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_account_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<Account>, AppError> {
    let account = conn
        .query_row(
            "SELECT id, username, full_name, is_admin, active, created_at
             FROM accounts WHERE username = ?1",
            params![username],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn update_account_name(
    conn: &Connection,
    account_id: Uuid,
    full_name: &str,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE accounts SET full_name = ?2 WHERE id = ?1",
        params![account_id.to_string(), full_name],
    )?;
    Ok(())
}

pub fn insert_profile(conn: &Connection, profile: &UserProfile) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO profiles (id, account_id, phone, role, shift_state, break_started_at,
         vehicle_id, photo_path, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            profile.id.to_string(),
            profile.account_id.to_string(),
            profile.phone,
            profile.role.as_str(),
            profile.shift_state.as_str(),
            profile.break_started_at.map(now_text),
            profile.vehicle_id.map(|id| id.to_string()),
            profile.photo_path,
            profile.active,
            now_text(profile.created_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: Uuid) -> Result<Option<UserProfile>, AppError> {
    let profile = conn
        .query_row(
            &format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles p
                 JOIN accounts a ON a.id = p.account_id
                 WHERE p.id = ?1"
            ),
            params![id.to_string()],
            profile_from_row,
        )
        .optional()?;
    Ok(profile)
}

pub fn find_by_account(
    conn: &Connection,
    account_id: Uuid,
) -> Result<Option<UserProfile>, AppError> {
    let profile = conn
        .query_row(
            &format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles p
                 JOIN accounts a ON a.id = p.account_id
                 WHERE p.account_id = ?1"
            ),
            params![account_id.to_string()],
            profile_from_row,
        )
        .optional()?;
    Ok(profile)
}

/// Reverse lookup: the profile currently holding the given vehicle.
pub fn find_by_vehicle(
    conn: &Connection,
    vehicle_id: Uuid,
) -> Result<Option<UserProfile>, AppError> {
    let profile = conn
        .query_row(
            &format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles p
                 JOIN accounts a ON a.id = p.account_id
                 WHERE p.vehicle_id = ?1"
            ),
            params![vehicle_id.to_string()],
            profile_from_row,
        )
        .optional()?;
    Ok(profile)
}

#[derive(Debug, Default, Clone)]
pub struct ProfileFilter {
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// `scope` restricts the listing to one profile id (courier visibility).
pub fn list(
    conn: &Connection,
    filter: &ProfileFilter,
    scope: Option<Uuid>,
) -> Result<Vec<UserProfile>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles p
         JOIN accounts a ON a.id = p.account_id
         WHERE (?1 IS NULL OR p.role = ?1)
           AND (?2 IS NULL OR p.active = ?2)
           AND (?3 IS NULL OR p.id = ?3)
         ORDER BY p.created_at DESC"
    ))?;

    let rows = stmt.query_map(
        params![
            filter.role.map(|role| role.as_str()),
            filter.active,
            scope.map(|id| id.to_string()),
        ],
        profile_from_row,
    )?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Assignable couriers: courier role, active, and never an admin
/// account, regardless of what the role field says.
pub fn courier_pool(conn: &Connection) -> Result<Vec<UserProfile>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles p
         JOIN accounts a ON a.id = p.account_id
         WHERE p.role = 'courier' AND p.active = 1 AND a.is_admin = 0
         ORDER BY a.username"
    ))?;

    let rows = stmt.query_map([], profile_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update_shift(
    conn: &Connection,
    id: Uuid,
    shift_state: ShiftState,
    break_started_at: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE profiles SET shift_state = ?2, break_started_at = ?3 WHERE id = ?1",
        params![
            id.to_string(),
            shift_state.as_str(),
            break_started_at.map(now_text),
        ],
    )?;
    Ok(())
}

pub fn set_vehicle(
    conn: &Connection,
    profile_id: Uuid,
    vehicle_id: Option<Uuid>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE profiles SET vehicle_id = ?2 WHERE id = ?1",
        params![profile_id.to_string(), vehicle_id.map(|id| id.to_string())],
    )?;
    Ok(())
}

/// Clears whichever profile currently links to the vehicle.
pub fn clear_vehicle_link(conn: &Connection, vehicle_id: Uuid) -> Result<(), AppError> {
    conn.execute(
        "UPDATE profiles SET vehicle_id = NULL WHERE vehicle_id = ?1",
        params![vehicle_id.to_string()],
    )?;
    Ok(())
}

pub struct ProfileUpdate<'a> {
    pub phone: Option<&'a str>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub photo_path: Option<&'a str>,
}

pub fn update_fields(
    conn: &Connection,
    id: Uuid,
    update: &ProfileUpdate<'_>,
) -> Result<(), AppError> {
    conn.execute(
        "UPDATE profiles SET
             phone = COALESCE(?2, phone),
             role = COALESCE(?3, role),
             active = COALESCE(?4, active),
             photo_path = COALESCE(?5, photo_path)
         WHERE id = ?1",
        params![
            id.to_string(),
            update.phone,
            update.role.map(|role| role.as_str()),
            update.active,
            update.photo_path,
        ],
    )?;
    Ok(())
}
