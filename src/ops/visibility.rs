//! Role-based read scope. One predicate, applied identically by every
//! entry point that lists or fetches orders, attempts, or profiles.

use uuid::Uuid;

use crate::auth::Principal;

/// `Some(profile_id)` restricts queries to records owned by that
/// courier; `None` means unrestricted (coordinator/admin).
pub fn courier_scope(principal: &Principal) -> Option<Uuid> {
    principal.is_courier().then_some(principal.profile.id)
}

#[cfg(test)]
mod tests {
    use super::courier_scope;
    use crate::models::profile::Role;
    use crate::ops::testutil;

    #[test]
    fn couriers_are_scoped_to_themselves() {
        let state = testutil::state();
        let courier = testutil::principal(&state, "rider", Role::Courier, false);

        assert_eq!(courier_scope(&courier), Some(courier.profile.id));
    }

    #[test]
    fn staff_roles_are_unscoped() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);
        let admin = testutil::principal(&state, "boss", Role::Admin, true);

        assert_eq!(courier_scope(&coordinator), None);
        assert_eq!(courier_scope(&admin), None);
    }
}
