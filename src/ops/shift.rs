//! Shift state and the bounded break timer. A break lasts at most one
//! hour; the timestamp exists only while the profile is on break.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::profile_repo;
use crate::error::AppError;
use crate::models::profile::{ShiftState, UserProfile};
use crate::state::AppState;

fn max_break() -> Duration {
    Duration::hours(1)
}

#[derive(Debug)]
pub struct ShiftChange {
    pub profile: UserProfile,
    /// The previous break ran out; the profile was forced to available.
    pub break_expired: bool,
    /// Still on an unexpired break; nothing was written.
    pub remaining_minutes: Option<i64>,
}

/// Only a courier may change its own shift state. `now` is injected so
/// the timer rule is checked against the caller's clock exactly once.
pub fn change_shift(
    state: &AppState,
    principal: &Principal,
    profile_id: Uuid,
    requested: ShiftState,
    now: DateTime<Utc>,
) -> Result<ShiftChange, AppError> {
    if !principal.is_courier() || principal.profile.id != profile_id {
        return Err(AppError::Permission(
            "only a courier may change its own shift state".to_string(),
        ));
    }

    state.db.with_tx(|tx| {
        let mut profile = profile_repo::find_by_id(tx, profile_id)?
            .ok_or_else(|| AppError::NotFound(format!("profile {profile_id} not found")))?;

        if requested == ShiftState::OnBreak {
            if profile.shift_state == ShiftState::OnBreak {
                if let Some(started) = profile.break_started_at {
                    let elapsed = now - started;
                    if elapsed >= max_break() {
                        // Break ran out: force back to available instead
                        // of re-entering it.
                        profile_repo::update_shift(tx, profile_id, ShiftState::Available, None)?;
                        profile.shift_state = ShiftState::Available;
                        profile.break_started_at = None;

                        tracing::info!(profile = %profile.username, "break expired");
                        return Ok(ShiftChange {
                            profile,
                            break_expired: true,
                            remaining_minutes: None,
                        });
                    }

                    let remaining = (max_break() - elapsed).num_minutes();
                    return Ok(ShiftChange {
                        profile,
                        break_expired: false,
                        remaining_minutes: Some(remaining),
                    });
                }
            }

            profile_repo::update_shift(tx, profile_id, ShiftState::OnBreak, Some(now))?;
            profile.shift_state = ShiftState::OnBreak;
            profile.break_started_at = Some(now);

            return Ok(ShiftChange {
                profile,
                break_expired: false,
                remaining_minutes: None,
            });
        }

        // Leaving (or never entering) a break always clears the timer.
        profile_repo::update_shift(tx, profile_id, requested, None)?;
        profile.shift_state = requested;
        profile.break_started_at = None;

        Ok(ShiftChange {
            profile,
            break_expired: false,
            remaining_minutes: None,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Role;
    use crate::ops::testutil;

    #[test]
    fn entering_break_stamps_start_time() {
        let state = testutil::state();
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let now = Utc::now();

        let change =
            change_shift(&state, &courier, courier.profile.id, ShiftState::OnBreak, now).unwrap();

        assert_eq!(change.profile.shift_state, ShiftState::OnBreak);
        assert_eq!(change.profile.break_started_at, Some(now));
        assert!(!change.break_expired);
    }

    #[test]
    fn break_under_an_hour_is_kept() {
        let state = testutil::state();
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let start = Utc::now();

        change_shift(&state, &courier, courier.profile.id, ShiftState::OnBreak, start).unwrap();

        let later = start + Duration::minutes(45);
        let change =
            change_shift(&state, &courier, courier.profile.id, ShiftState::OnBreak, later).unwrap();

        assert_eq!(change.profile.shift_state, ShiftState::OnBreak);
        assert!(!change.break_expired);
        assert_eq!(change.remaining_minutes, Some(15));
    }

    #[test]
    fn break_over_an_hour_forces_available() {
        let state = testutil::state();
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let start = Utc::now();

        change_shift(&state, &courier, courier.profile.id, ShiftState::OnBreak, start).unwrap();

        let later = start + Duration::minutes(65);
        let change =
            change_shift(&state, &courier, courier.profile.id, ShiftState::OnBreak, later).unwrap();

        assert_eq!(change.profile.shift_state, ShiftState::Available);
        assert!(change.break_expired);
        assert_eq!(change.profile.break_started_at, None);
    }

    #[test]
    fn leaving_break_clears_start_time() {
        let state = testutil::state();
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let start = Utc::now();

        change_shift(&state, &courier, courier.profile.id, ShiftState::OnBreak, start).unwrap();
        let change = change_shift(
            &state,
            &courier,
            courier.profile.id,
            ShiftState::Busy,
            start + Duration::minutes(10),
        )
        .unwrap();

        assert_eq!(change.profile.shift_state, ShiftState::Busy);
        assert_eq!(change.profile.break_started_at, None);
    }

    #[test]
    fn non_break_states_never_carry_a_start_time() {
        let state = testutil::state();
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let now = Utc::now();

        for requested in [ShiftState::Available, ShiftState::Busy] {
            let change =
                change_shift(&state, &courier, courier.profile.id, requested, now).unwrap();
            assert_eq!(change.profile.break_started_at, None);
        }
    }

    #[test]
    fn staff_cannot_change_shift_state() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);

        let err = change_shift(
            &state,
            &coordinator,
            coordinator.profile.id,
            ShiftState::OnBreak,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }

    #[test]
    fn courier_cannot_change_another_profile() {
        let state = testutil::state();
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let other = testutil::principal(&state, "other", Role::Courier, false);

        let err = change_shift(
            &state,
            &courier,
            other.profile.id,
            ShiftState::OnBreak,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Permission(_)));
    }
}
