//! Deterministic seed data. Every entity is keyed on a natural
//! identifier (username, plate, pharmacy name, client name, route
//! name, report date), so re-running the loader changes nothing.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::Principal;
use crate::db::{order_repo, pharmacy_repo, profile_repo, route_repo, vehicle_repo};
use crate::error::AppError;
use crate::models::order::{OrderStatus, OrderType};
use crate::models::pharmacy::Pharmacy;
use crate::models::profile::{Account, Role, ShiftState, UserProfile};
use crate::models::route::Route;
use crate::ops::{dispatch, fleet, orders, report};
use crate::state::AppState;

pub fn run(state: &AppState) -> Result<(), AppError> {
    let admin = ensure_account(state, "admin", "System Administrator", true, Role::Admin)?;
    ensure_account(state, "coordinator1", "Maria Gonzalez", false, Role::Coordinator)?;
    ensure_account(state, "coordinator2", "Carlos Rodriguez", false, Role::Coordinator)?;
    let couriers = [
        ensure_account(state, "courier1", "Juan Perez", false, Role::Courier)?,
        ensure_account(state, "courier2", "Pedro Sanchez", false, Role::Courier)?,
        ensure_account(state, "courier3", "Diego Munoz", false, Role::Courier)?,
    ];

    let pharmacies = [
        ensure_pharmacy(state, "Farmacia Central", "Av. Providencia 1234", "Santiago")?,
        ensure_pharmacy(state, "Farmacia Norte", "Av. Las Condes 5678", "Santiago")?,
        ensure_pharmacy(state, "Farmacia Sur", "Av. La Florida 9012", "Santiago")?,
    ];

    let vehicles = [
        ensure_vehicle(state, &admin, "ABCD12", "Yamaha", "FZ16", 2020)?,
        ensure_vehicle(state, &admin, "EFGH34", "Honda", "CB125F", 2021)?,
        ensure_vehicle(state, &admin, "IJKL56", "Suzuki", "GN125", 2019)?,
        ensure_vehicle(state, &admin, "MNOP78", "Yamaha", "MT-03", 2022)?,
        ensure_vehicle(state, &admin, "QRST90", "Honda", "XR150L", 2020)?,
    ];

    for (courier, vehicle_id) in couriers.iter().zip(vehicles.iter()) {
        let current = state
            .db
            .with_conn(|conn| profile_repo::find_by_id(conn, courier.profile.id))?
            .ok_or_else(|| AppError::Internal("seeded courier vanished".to_string()))?;
        if current.vehicle_id.is_none() {
            fleet::assign_vehicle(state, &admin, *vehicle_id, courier.profile.id)?;
        }
    }

    let seed_orders = [
        SeedOrder {
            client: "Ana Martinez",
            address: "Av. Providencia 123, Santiago",
            phone: "+56911111111",
            order_type: OrderType::HeldPrescription,
            status: OrderStatus::PrescriptionPickup,
            transfer: None,
            courier: Some(0),
            medicines: &[("MED001", "Paracetamol 500mg", 20), ("MED004", "Omeprazole 20mg", 30)],
            attempts: &["unavailable", "delivered"],
        },
        SeedOrder {
            client: "Luis Fernandez",
            address: "Calle Las Condes 456, Las Condes",
            phone: "+56922222222",
            order_type: OrderType::Normal,
            status: OrderStatus::PrescriptionPickup,
            transfer: None,
            courier: Some(1),
            medicines: &[("MED002", "Ibuprofen 400mg", 15)],
            attempts: &["error"],
        },
        SeedOrder {
            client: "Carmen Silva",
            address: "Av. Vitacura 789, Vitacura",
            phone: "+56933333333",
            order_type: OrderType::Normal,
            status: OrderStatus::Transfer,
            transfer: Some((0, 1)),
            courier: Some(2),
            medicines: &[("MED003", "Amoxicillin 500mg", 14)],
            attempts: &[],
        },
        SeedOrder {
            client: "Roberto Vargas",
            address: "Calle Nueva Providencia 321, Providencia",
            phone: "+56944444444",
            order_type: OrderType::HeldPrescription,
            status: OrderStatus::PrescriptionPickup,
            transfer: None,
            courier: None,
            medicines: &[("MED006", "Metformin 500mg", 60)],
            attempts: &[],
        },
        SeedOrder {
            client: "Patricia Morales",
            address: "Av. Apoquindo 654, Las Condes",
            phone: "+56955555555",
            order_type: OrderType::Normal,
            status: OrderStatus::Transfer,
            transfer: Some((1, 2)),
            courier: None,
            medicines: &[("MED007", "Atorvastatin 20mg", 30), ("MED008", "Losartan 50mg", 30)],
            attempts: &[],
        },
        SeedOrder {
            client: "Fernando Torres",
            address: "Calle El Bosque 987, La Reina",
            phone: "+56966666666",
            order_type: OrderType::Normal,
            status: OrderStatus::PrescriptionPickup,
            transfer: None,
            courier: Some(0),
            medicines: &[("MED005", "Loratadine 10mg", 10)],
            attempts: &["delivered"],
        },
    ];

    let mut order_ids = Vec::new();
    for entry in &seed_orders {
        order_ids.push(ensure_order(state, &admin, entry, &pharmacies, &couriers)?);
    }

    ensure_route(state, "Ruta Centro", "Santiago Centro", &couriers[0], &order_ids[..2])?;
    ensure_route(state, "Ruta Las Condes", "Las Condes", &couriers[1], &order_ids[2..4])?;

    let today = Utc::now().date_naive();
    for days_back in 1..=7 {
        report::generate_for(&state.db, today - Duration::days(days_back))?;
    }

    tracing::info!("seed data loaded");
    Ok(())
}

struct SeedOrder {
    client: &'static str,
    address: &'static str,
    phone: &'static str,
    order_type: OrderType,
    status: OrderStatus,
    /// Indexes into the seeded pharmacies: (origin, destination).
    transfer: Option<(usize, usize)>,
    /// Index into the seeded couriers.
    courier: Option<usize>,
    medicines: &'static [(&'static str, &'static str, u32)],
    attempts: &'static [&'static str],
}

fn ensure_account(
    state: &AppState,
    username: &str,
    full_name: &str,
    is_admin: bool,
    role: Role,
) -> Result<Principal, AppError> {
    let existing = state
        .db
        .with_conn(|conn| profile_repo::find_account_by_username(conn, username))?;

    let account = match existing {
        Some(account) => account,
        None => {
            let account = Account {
                id: Uuid::new_v4(),
                username: username.to_string(),
                full_name: full_name.to_string(),
                is_admin,
                active: true,
                created_at: Utc::now(),
            };
            state
                .db
                .with_conn(|conn| profile_repo::insert_account(conn, &account))?;
            tracing::info!(account = username, "account seeded");
            account
        }
    };

    let existing_profile = state
        .db
        .with_conn(|conn| profile_repo::find_by_account(conn, account.id))?;
    let profile = match existing_profile {
        Some(profile) => profile,
        None => {
            let profile = UserProfile {
                id: Uuid::new_v4(),
                account_id: account.id,
                username: account.username.clone(),
                full_name: account.full_name.clone(),
                is_admin: account.is_admin,
                phone: String::new(),
                role,
                shift_state: ShiftState::Available,
                break_started_at: None,
                vehicle_id: None,
                photo_path: None,
                active: true,
                created_at: Utc::now(),
            };
            state
                .db
                .with_conn(|conn| profile_repo::insert_profile(conn, &profile))?;
            profile
        }
    };

    Ok(Principal { account, profile })
}

fn ensure_pharmacy(
    state: &AppState,
    name: &str,
    address: &str,
    city: &str,
) -> Result<Uuid, AppError> {
    if let Some(existing) = state
        .db
        .with_conn(|conn| pharmacy_repo::find_by_name(conn, name))?
    {
        return Ok(existing.id);
    }

    let pharmacy = Pharmacy {
        id: Uuid::new_v4(),
        name: name.to_string(),
        address: address.to_string(),
        city: city.to_string(),
        active: true,
        created_at: Utc::now(),
    };
    state
        .db
        .with_conn(|conn| pharmacy_repo::insert(conn, &pharmacy))?;
    tracing::info!(pharmacy = name, "pharmacy seeded");
    Ok(pharmacy.id)
}

fn ensure_vehicle(
    state: &AppState,
    admin: &Principal,
    plate: &str,
    make: &str,
    model: &str,
    year: i32,
) -> Result<Uuid, AppError> {
    if let Some(existing) = state
        .db
        .with_conn(|conn| vehicle_repo::find_by_plate(conn, plate))?
    {
        return Ok(existing.id);
    }

    let vehicle = fleet::create_vehicle(
        state,
        admin,
        fleet::NewVehicle {
            plate: plate.to_string(),
            make: make.to_string(),
            model: model.to_string(),
            year,
            notes: None,
        },
    )?;
    tracing::info!(plate = plate, "vehicle seeded");
    Ok(vehicle.id)
}

fn ensure_order(
    state: &AppState,
    admin: &Principal,
    entry: &SeedOrder,
    pharmacies: &[Uuid],
    couriers: &[Principal],
) -> Result<Uuid, AppError> {
    if let Some(existing) = state
        .db
        .with_conn(|conn| order_repo::find_by_client(conn, entry.client))?
    {
        return Ok(existing.id);
    }

    let (origin, destination) = match entry.transfer {
        Some((origin, destination)) => (Some(pharmacies[origin]), Some(pharmacies[destination])),
        None => (None, None),
    };

    let order = orders::create_order(
        state,
        admin,
        orders::NewOrder {
            client_name: entry.client.to_string(),
            client_address: entry.address.to_string(),
            client_phone: Some(entry.phone.to_string()),
            notes: None,
            priority: None,
            order_type: Some(entry.order_type),
            status: Some(entry.status),
            origin_pharmacy_id: origin,
            destination_pharmacy_id: destination,
            courier_id: entry.courier.map(|index| couriers[index].profile.id),
            medicines: entry
                .medicines
                .iter()
                .map(|(code, name, quantity)| orders::NewMedicineLine {
                    code: (*code).to_string(),
                    name: (*name).to_string(),
                    quantity: *quantity,
                    notes: None,
                })
                .collect(),
        },
    )?;

    for outcome in entry.attempts {
        dispatch::record_attempt(
            state,
            admin,
            order.id,
            dispatch::AttemptInput {
                outcome: (*outcome).to_string(),
                courier_id: entry.courier.map(|index| couriers[index].profile.id),
                lat: None,
                lng: None,
                photo_path: None,
                notes: None,
            },
        )?;
    }

    tracing::info!(client = entry.client, "order seeded");
    Ok(order.id)
}

fn ensure_route(
    state: &AppState,
    name: &str,
    zone: &str,
    courier: &Principal,
    order_ids: &[Uuid],
) -> Result<(), AppError> {
    let existing = state
        .db
        .with_conn(|conn| route_repo::find_by_name(conn, name))?;
    if existing.is_some() {
        return Ok(());
    }

    let route = Route {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("deliveries around {zone}"),
        zone: zone.to_string(),
        vehicle_label: "motorbike".to_string(),
        courier_id: Some(courier.profile.id),
        active: true,
        order_ids: order_ids.to_vec(),
        created_at: Utc::now(),
    };
    state.db.with_tx(|tx| route_repo::insert(tx, &route))?;
    tracing::info!(route = name, "route seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[test]
    fn seeding_twice_creates_nothing_new() {
        let state = AppState::new(Database::open_in_memory().unwrap());

        run(&state).unwrap();

        let counts = |state: &AppState| -> (i64, i64, i64, i64, i64) {
            state
                .db
                .with_conn(|conn| {
                    let count = |table: &str| -> Result<i64, AppError> {
                        Ok(conn.query_row(
                            &format!("SELECT COUNT(*) FROM {table}"),
                            [],
                            |row| row.get(0),
                        )?)
                    };
                    Ok((
                        count("accounts")?,
                        count("orders")?,
                        count("vehicles")?,
                        count("delivery_attempts")?,
                        count("daily_reports")?,
                    ))
                })
                .unwrap()
        };

        let first = counts(&state);
        run(&state).unwrap();
        let second = counts(&state);

        assert_eq!(first, second);
        assert_eq!(first.0, 6); // admin + 2 coordinators + 3 couriers
        assert_eq!(first.1, 6);
        assert_eq!(first.2, 5);
    }

    #[test]
    fn seeded_couriers_hold_vehicles() {
        let state = AppState::new(Database::open_in_memory().unwrap());
        run(&state).unwrap();

        let pool = crate::ops::profiles::courier_pool(&state).unwrap();
        assert_eq!(pool.len(), 3);
        assert!(pool.iter().all(|profile| profile.vehicle_id.is_some()));
    }
}
