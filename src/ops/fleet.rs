//! Vehicle fleet: registration, the courier link swap, release, and the
//! maintenance override. The link lives on the profile; every swap
//! touches both sides inside one transaction.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::vehicle_repo::{self, VehicleUpdate};
use crate::db::profile_repo;
use crate::error::AppError;
use crate::models::profile::{Role, UserProfile};
use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::state::AppState;

fn require_staff(principal: &Principal, action: &str) -> Result<(), AppError> {
    if !principal.is_staff() {
        return Err(AppError::Permission(format!(
            "only a coordinator or administrator may {action}"
        )));
    }
    Ok(())
}

pub struct NewVehicle {
    pub plate: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub notes: Option<String>,
}

pub fn create_vehicle(
    state: &AppState,
    principal: &Principal,
    input: NewVehicle,
) -> Result<Vehicle, AppError> {
    require_staff(principal, "register vehicles")?;

    let plate = input.plate.trim().to_uppercase();
    if plate.is_empty() {
        return Err(AppError::Validation("plate cannot be empty".to_string()));
    }
    if input.year < 1900 {
        return Err(AppError::Validation("year must be 1900 or later".to_string()));
    }

    state.db.with_tx(|tx| {
        if vehicle_repo::find_by_plate(tx, &plate)?.is_some() {
            return Err(AppError::Conflict(format!("plate {plate} already registered")));
        }

        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate,
            make: input.make.clone(),
            model: input.model.clone(),
            year: input.year,
            status: VehicleStatus::Available,
            active: true,
            last_maintenance: None,
            next_maintenance: None,
            notes: input.notes.clone().unwrap_or_default(),
            assigned_courier_id: None,
            created_at: Utc::now(),
        };
        vehicle_repo::insert(tx, &vehicle)?;

        tracing::info!(plate = %vehicle.plate, "vehicle registered");
        Ok(vehicle)
    })
}

pub fn list_vehicles(
    state: &AppState,
    status: Option<VehicleStatus>,
    active: Option<bool>,
) -> Result<Vec<Vehicle>, AppError> {
    state.db.with_conn(|conn| vehicle_repo::list(conn, status, active))
}

pub fn get_vehicle(state: &AppState, vehicle_id: Uuid) -> Result<Vehicle, AppError> {
    state
        .db
        .with_conn(|conn| vehicle_repo::find_by_id(conn, vehicle_id))?
        .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))
}

pub struct VehicleChanges {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

pub fn update_vehicle(
    state: &AppState,
    principal: &Principal,
    vehicle_id: Uuid,
    changes: VehicleChanges,
) -> Result<Vehicle, AppError> {
    require_staff(principal, "edit vehicles")?;

    if let Some(year) = changes.year {
        if year < 1900 {
            return Err(AppError::Validation("year must be 1900 or later".to_string()));
        }
    }

    state.db.with_tx(|tx| {
        vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;

        vehicle_repo::update_fields(
            tx,
            vehicle_id,
            &VehicleUpdate {
                make: changes.make.as_deref(),
                model: changes.model.as_deref(),
                year: changes.year,
                active: changes.active,
                notes: changes.notes.as_deref(),
            },
        )?;

        vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::Internal("vehicle vanished during update".to_string()))
    })
}

/// Links the vehicle to the courier. Any previous vehicle of the
/// courier is released to available, any previous holder of the vehicle
/// loses only its link, and the vehicle ends in use; one transaction
/// covers all four writes.
pub fn assign_vehicle(
    state: &AppState,
    principal: &Principal,
    vehicle_id: Uuid,
    courier_id: Uuid,
) -> Result<(Vehicle, UserProfile), AppError> {
    require_staff(principal, "assign vehicles")?;

    let result = state.db.with_tx(|tx| {
        let vehicle = vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;

        let courier = profile_repo::find_by_id(tx, courier_id)?
            .filter(|profile| profile.role == Role::Courier)
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))?;

        if courier.is_admin {
            return Err(AppError::Validation(
                "a vehicle cannot be assigned to an administrator account".to_string(),
            ));
        }
        if !matches!(vehicle.status, VehicleStatus::Available | VehicleStatus::InUse) {
            return Err(AppError::Conflict(format!(
                "vehicle {} is not available for assignment",
                vehicle.plate
            )));
        }

        // Release the courier's previous vehicle.
        if let Some(previous) = courier.vehicle_id {
            if previous != vehicle_id {
                vehicle_repo::set_status(tx, previous, VehicleStatus::Available)?;
            }
        }
        // Clear any previous holder of this vehicle; only the link goes.
        profile_repo::clear_vehicle_link(tx, vehicle_id)?;

        profile_repo::set_vehicle(tx, courier_id, Some(vehicle_id))?;
        vehicle_repo::set_status(tx, vehicle_id, VehicleStatus::InUse)?;

        let vehicle = vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::Internal("vehicle vanished during assignment".to_string()))?;
        let courier = profile_repo::find_by_id(tx, courier_id)?
            .ok_or_else(|| AppError::Internal("courier vanished during assignment".to_string()))?;
        Ok((vehicle, courier))
    })?;

    state.metrics.vehicle_assignments_total.inc();
    refresh_in_use_gauge(state)?;
    tracing::info!(
        plate = %result.0.plate,
        courier = %result.1.username,
        "vehicle assigned"
    );

    Ok(result)
}

/// Clears the link and releases the vehicle back to available.
pub fn unassign_vehicle(
    state: &AppState,
    principal: &Principal,
    vehicle_id: Uuid,
) -> Result<Vehicle, AppError> {
    require_staff(principal, "unassign vehicles")?;

    let vehicle = state.db.with_tx(|tx| {
        let vehicle = vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;

        let holder = profile_repo::find_by_vehicle(tx, vehicle_id)?;
        if holder.is_none() {
            return Err(AppError::Validation(format!(
                "vehicle {} has no assigned courier",
                vehicle.plate
            )));
        }

        profile_repo::clear_vehicle_link(tx, vehicle_id)?;
        vehicle_repo::set_status(tx, vehicle_id, VehicleStatus::Available)?;

        vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::Internal("vehicle vanished during release".to_string()))
    })?;

    refresh_in_use_gauge(state)?;
    tracing::info!(plate = %vehicle.plate, "vehicle released");

    Ok(vehicle)
}

pub struct MaintenanceInput {
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Forces the vehicle into maintenance regardless of the current
/// holder. The holder's link deliberately survives; releasing it is the
/// caller's call.
pub fn set_maintenance(
    state: &AppState,
    principal: &Principal,
    vehicle_id: Uuid,
    input: MaintenanceInput,
) -> Result<Vehicle, AppError> {
    require_staff(principal, "flag vehicles for maintenance")?;

    let vehicle = state.db.with_tx(|tx| {
        vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))?;

        vehicle_repo::set_maintenance(
            tx,
            vehicle_id,
            input.last_maintenance,
            input.next_maintenance,
            input.notes.as_deref(),
        )?;

        vehicle_repo::find_by_id(tx, vehicle_id)?
            .ok_or_else(|| AppError::Internal("vehicle vanished during maintenance".to_string()))
    })?;

    refresh_in_use_gauge(state)?;
    tracing::info!(plate = %vehicle.plate, "vehicle flagged for maintenance");

    Ok(vehicle)
}

fn refresh_in_use_gauge(state: &AppState) -> Result<(), AppError> {
    let in_use = state.db.with_conn(vehicle_repo::count_in_use)?;
    state.metrics.vehicles_in_use.set(in_use);
    Ok(())
}
