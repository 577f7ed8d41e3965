//! Order intake and maintenance: creation defaults, courier assignment,
//! medicine lines, and scoped reads.

use chrono::Utc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::order_repo::{self, OrderFilter, OrderUpdate};
use crate::db::{log_repo, profile_repo};
use crate::error::AppError;
use crate::models::log::StatusLogEntry;
use crate::models::order::{MedicineLine, Order, OrderStatus, OrderType, Priority};
use crate::models::profile::{Role, UserProfile};
use crate::ops::{status, visibility};
use crate::state::AppState;

pub struct NewMedicineLine {
    pub code: String,
    pub name: String,
    pub quantity: u32,
    pub notes: Option<String>,
}

pub struct NewOrder {
    pub client_name: String,
    pub client_address: String,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub order_type: Option<OrderType>,
    pub status: Option<OrderStatus>,
    pub origin_pharmacy_id: Option<Uuid>,
    pub destination_pharmacy_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    pub medicines: Vec<NewMedicineLine>,
}

/// Creates an order with its medicine lines and the initial log entry.
/// A missing priority defaults by type: held prescriptions are high,
/// normal orders medium.
pub fn create_order(
    state: &AppState,
    principal: &Principal,
    input: NewOrder,
) -> Result<Order, AppError> {
    if input.client_name.trim().is_empty() {
        return Err(AppError::Validation("client name cannot be empty".to_string()));
    }
    for line in &input.medicines {
        if line.quantity < 1 {
            return Err(AppError::Validation(format!(
                "medicine {} quantity must be at least 1",
                line.code
            )));
        }
    }
    if input.courier_id.is_some() && !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may assign a courier".to_string(),
        ));
    }

    let order_type = input.order_type.unwrap_or(OrderType::Normal);
    let priority = input.priority.unwrap_or_else(|| order_type.default_priority());
    let order_status = input.status.unwrap_or(OrderStatus::PrescriptionPickup);

    state.db.with_tx(|tx| {
        let (origin, destination) = if order_status == OrderStatus::Transfer {
            let (origin, destination) = status::resolve_transfer_pharmacies(
                tx,
                input.origin_pharmacy_id,
                input.destination_pharmacy_id,
            )?;
            (Some(origin), Some(destination))
        } else {
            (input.origin_pharmacy_id, input.destination_pharmacy_id)
        };

        if let Some(courier_id) = input.courier_id {
            eligible_courier(tx, courier_id)?;
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            client_name: input.client_name.trim().to_string(),
            client_address: input.client_address,
            client_phone: input.client_phone.unwrap_or_default(),
            notes: input.notes.unwrap_or_default(),
            priority,
            order_type,
            status: order_status,
            origin_pharmacy_id: origin,
            destination_pharmacy_id: destination,
            courier_id: input.courier_id,
            created_at: now,
            updated_at: now,
        };
        order_repo::insert(tx, &order)?;

        for line in &input.medicines {
            order_repo::insert_medicine(
                tx,
                &MedicineLine {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    code: line.code.clone(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    notes: line.notes.clone().unwrap_or_default(),
                },
            )?;
        }

        log_repo::append(
            tx,
            &StatusLogEntry {
                id: Uuid::new_v4(),
                order_id: order.id,
                status: order.status,
                description: "order created".to_string(),
                courier_id: order.courier_id,
                attempt_id: None,
                created_at: now,
            },
        )?;

        tracing::info!(order_id = %order.id, client = %order.client_name, "order created");
        Ok(order)
    })
}

pub fn list_orders(
    state: &AppState,
    principal: &Principal,
    filter: &OrderFilter,
) -> Result<Vec<Order>, AppError> {
    let scope = visibility::courier_scope(principal);
    state.db.with_conn(|conn| order_repo::list(conn, filter, scope))
}

pub fn get_order(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
) -> Result<Order, AppError> {
    let scope = visibility::courier_scope(principal);
    state
        .db
        .with_conn(|conn| order_repo::find_by_id(conn, order_id, scope))?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
}

pub struct OrderChanges {
    pub client_name: Option<String>,
    pub client_address: Option<String>,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub order_type: Option<OrderType>,
}

/// Coordinator/admin edit of the order's descriptive fields. Status
/// moves only through the status transition operation.
pub fn update_order(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
    changes: OrderChanges,
) -> Result<Order, AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may edit orders".to_string(),
        ));
    }

    state.db.with_tx(|tx| {
        order_repo::find_by_id(tx, order_id, None)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        order_repo::update_fields(
            tx,
            order_id,
            &OrderUpdate {
                client_name: changes.client_name.as_deref(),
                client_address: changes.client_address.as_deref(),
                client_phone: changes.client_phone.as_deref(),
                notes: changes.notes.as_deref(),
                priority: changes.priority,
                order_type: changes.order_type,
            },
            Utc::now(),
        )?;

        order_repo::find_by_id(tx, order_id, None)?
            .ok_or_else(|| AppError::Internal("order vanished during update".to_string()))
    })
}

pub fn delete_order(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
) -> Result<(), AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may delete orders".to_string(),
        ));
    }

    let deleted = state.db.with_conn(|conn| order_repo::delete(conn, order_id))?;
    if !deleted {
        return Err(AppError::NotFound(format!("order {order_id} not found")));
    }
    Ok(())
}

/// Assigns the responsible courier. The target must be an active,
/// non-admin courier profile that currently holds a vehicle.
pub fn assign_courier(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
    courier_id: Uuid,
) -> Result<Order, AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(
            "only a coordinator or administrator may assign a courier".to_string(),
        ));
    }

    state.db.with_tx(|tx| {
        let order = order_repo::find_by_id(tx, order_id, None)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let courier = eligible_courier(tx, courier_id)?;

        let now = Utc::now();
        order_repo::set_courier(tx, order_id, Some(courier_id), now)?;
        log_repo::append(
            tx,
            &StatusLogEntry {
                id: Uuid::new_v4(),
                order_id,
                status: order.status,
                description: format!("courier assigned: {}", courier.username),
                courier_id: Some(courier_id),
                attempt_id: None,
                created_at: now,
            },
        )?;

        tracing::info!(order_id = %order_id, courier = %courier.username, "courier assigned");
        order_repo::find_by_id(tx, order_id, None)?
            .ok_or_else(|| AppError::Internal("order vanished during assignment".to_string()))
    })
}

/// A profile fit to be responsible for an order.
fn eligible_courier(
    conn: &rusqlite::Connection,
    courier_id: Uuid,
) -> Result<UserProfile, AppError> {
    let courier = profile_repo::find_by_id(conn, courier_id)?
        .filter(|profile| profile.role == Role::Courier)
        .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

    if courier.is_admin {
        return Err(AppError::Validation(
            "an administrator account cannot be assigned as courier".to_string(),
        ));
    }
    if !courier.active {
        return Err(AppError::Validation("courier profile is inactive".to_string()));
    }
    if courier.vehicle_id.is_none() {
        return Err(AppError::Validation(
            "courier must hold an assigned vehicle".to_string(),
        ));
    }
    Ok(courier)
}

pub fn add_medicine(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
    line: NewMedicineLine,
) -> Result<MedicineLine, AppError> {
    if line.quantity < 1 {
        return Err(AppError::Validation("quantity must be at least 1".to_string()));
    }

    let scope = visibility::courier_scope(principal);
    state.db.with_tx(|tx| {
        order_repo::find_by_id(tx, order_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        let medicine = MedicineLine {
            id: Uuid::new_v4(),
            order_id,
            code: line.code,
            name: line.name,
            quantity: line.quantity,
            notes: line.notes.unwrap_or_default(),
        };
        order_repo::insert_medicine(tx, &medicine)?;
        Ok(medicine)
    })
}

pub fn list_medicines(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
) -> Result<Vec<MedicineLine>, AppError> {
    let scope = visibility::courier_scope(principal);
    state.db.with_conn(|conn| {
        order_repo::find_by_id(conn, order_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        order_repo::list_medicines(conn, order_id)
    })
}

pub fn remove_medicine(
    state: &AppState,
    principal: &Principal,
    order_id: Uuid,
    line_id: Uuid,
) -> Result<(), AppError> {
    let scope = visibility::courier_scope(principal);
    state.db.with_tx(|tx| {
        order_repo::find_by_id(tx, order_id, scope)?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if !order_repo::delete_medicine(tx, order_id, line_id)? {
            return Err(AppError::NotFound(format!("medicine line {line_id} not found")));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::vehicle_repo;
    use crate::models::vehicle::{Vehicle, VehicleStatus};
    use crate::ops::testutil;

    fn plain_order(client: &str) -> NewOrder {
        NewOrder {
            client_name: client.to_string(),
            client_address: "12 Elm St".to_string(),
            client_phone: None,
            notes: None,
            priority: None,
            order_type: None,
            status: None,
            origin_pharmacy_id: None,
            destination_pharmacy_id: None,
            courier_id: None,
            medicines: Vec::new(),
        }
    }

    fn vehicle_fixture(state: &crate::state::AppState, plate: &str) -> Vehicle {
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate: plate.to_string(),
            make: "Yamaha".to_string(),
            model: "FZ16".to_string(),
            year: 2020,
            status: VehicleStatus::Available,
            active: true,
            last_maintenance: None,
            next_maintenance: None,
            notes: String::new(),
            assigned_courier_id: None,
            created_at: Utc::now(),
        };
        state
            .db
            .with_conn(|conn| vehicle_repo::insert(conn, &vehicle))
            .unwrap();
        vehicle
    }

    #[test]
    fn normal_order_defaults_to_medium_priority() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);

        let order = create_order(&state, &coordinator, plain_order("Ana")).unwrap();

        assert_eq!(order.priority, Priority::Medium);
        assert_eq!(order.order_type, OrderType::Normal);
        assert_eq!(order.status, OrderStatus::PrescriptionPickup);
    }

    #[test]
    fn held_prescription_defaults_to_high_priority() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);

        let mut input = plain_order("Luis");
        input.order_type = Some(OrderType::HeldPrescription);
        let order = create_order(&state, &coordinator, input).unwrap();

        assert_eq!(order.priority, Priority::High);
    }

    #[test]
    fn explicit_priority_wins_over_default() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);

        let mut input = plain_order("Carmen");
        input.order_type = Some(OrderType::HeldPrescription);
        input.priority = Some(Priority::Low);
        let order = create_order(&state, &coordinator, input).unwrap();

        assert_eq!(order.priority, Priority::Low);
    }

    #[test]
    fn creation_appends_initial_log_entry() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);

        let order = create_order(&state, &coordinator, plain_order("Ana")).unwrap();
        let log = state
            .db
            .with_conn(|conn| log_repo::list_for_order(conn, order.id))
            .unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].description, "order created");
        assert_eq!(log[0].status, OrderStatus::PrescriptionPickup);
    }

    #[test]
    fn zero_quantity_medicine_is_rejected() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);

        let mut input = plain_order("Ana");
        input.medicines.push(NewMedicineLine {
            code: "MED001".to_string(),
            name: "Paracetamol 500mg".to_string(),
            quantity: 0,
            notes: None,
        });

        let err = create_order(&state, &coordinator, input).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn assigning_courier_without_vehicle_is_rejected() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);
        let courier = testutil::principal(&state, "rider", Role::Courier, false);

        let order = create_order(&state, &coordinator, plain_order("Ana")).unwrap();
        let err = assign_courier(&state, &coordinator, order.id, courier.profile.id).unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn assigning_admin_account_as_courier_is_rejected() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);
        // Admin account manually re-labelled as courier.
        let disguised = testutil::principal(&state, "disguised", Role::Courier, true);
        let vehicle = vehicle_fixture(&state, "ABCD12");
        state
            .db
            .with_conn(|conn| profile_repo::set_vehicle(conn, disguised.profile.id, Some(vehicle.id)))
            .unwrap();

        let order = create_order(&state, &coordinator, plain_order("Ana")).unwrap();
        let err = assign_courier(&state, &coordinator, order.id, disguised.profile.id).unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn assignment_logs_and_sets_responsible() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let vehicle = vehicle_fixture(&state, "ABCD12");
        state
            .db
            .with_conn(|conn| profile_repo::set_vehicle(conn, courier.profile.id, Some(vehicle.id)))
            .unwrap();

        let order = create_order(&state, &coordinator, plain_order("Ana")).unwrap();
        let updated = assign_courier(&state, &coordinator, order.id, courier.profile.id).unwrap();

        assert_eq!(updated.courier_id, Some(courier.profile.id));

        let log = state
            .db
            .with_conn(|conn| log_repo::list_for_order(conn, order.id))
            .unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].description.contains("courier assigned"));
    }

    #[test]
    fn courier_list_is_scoped_to_own_orders() {
        let state = testutil::state();
        let coordinator = testutil::principal(&state, "coord", Role::Coordinator, false);
        let courier = testutil::principal(&state, "rider", Role::Courier, false);
        let vehicle = vehicle_fixture(&state, "ABCD12");
        state
            .db
            .with_conn(|conn| profile_repo::set_vehicle(conn, courier.profile.id, Some(vehicle.id)))
            .unwrap();

        let mine = create_order(&state, &coordinator, plain_order("Ana")).unwrap();
        create_order(&state, &coordinator, plain_order("Luis")).unwrap();
        assign_courier(&state, &coordinator, mine.id, courier.profile.id).unwrap();

        let visible = list_orders(&state, &courier, &OrderFilter::default()).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, mine.id);

        let all = list_orders(&state, &coordinator, &OrderFilter::default()).unwrap();
        assert_eq!(all.len(), 2);

        // Detail access misses read as absent for foreign couriers.
        let other = testutil::principal(&state, "other", Role::Courier, false);
        let err = get_order(&state, &other, mine.id).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
