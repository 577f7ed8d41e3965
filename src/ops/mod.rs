pub mod dispatch;
pub mod fleet;
pub mod orders;
pub mod profiles;
pub mod report;
pub mod shift;
pub mod status;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::auth::{principal_for, Principal};
    use crate::db::{profile_repo, Database};
    use crate::models::profile::{Account, Role, ShiftState, UserProfile};
    use crate::state::AppState;

    pub fn state() -> AppState {
        AppState::new(Database::open_in_memory().expect("in-memory database"))
    }

    /// Creates an account + profile pair and returns it as a principal.
    pub fn principal(state: &AppState, username: &str, role: Role, is_admin: bool) -> Principal {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            full_name: username.to_string(),
            is_admin,
            active: true,
            created_at: now,
        };
        let profile = UserProfile {
            id: Uuid::new_v4(),
            account_id: account.id,
            username: account.username.clone(),
            full_name: account.full_name.clone(),
            is_admin,
            phone: String::new(),
            role,
            shift_state: ShiftState::Available,
            break_started_at: None,
            vehicle_id: None,
            photo_path: None,
            active: true,
            created_at: now,
        };

        state
            .db
            .with_tx(|tx| {
                profile_repo::insert_account(tx, &account)?;
                profile_repo::insert_profile(tx, &profile)?;
                Ok(())
            })
            .expect("insert principal fixtures");

        principal_for(account, profile)
    }
}
