use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use pharmacy_dispatch::api::rest::router;
use pharmacy_dispatch::db::{profile_repo, Database};
use pharmacy_dispatch::models::profile::{Account, Role, ShiftState, UserProfile};
use pharmacy_dispatch::state::AppState;

struct TestApp {
    app: axum::Router,
    rider_profile: Uuid,
    rider2_profile: Uuid,
}

fn seed_principal(state: &AppState, username: &str, role: Role, is_admin: bool) -> Uuid {
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
        .expect("seed principal");

    profile.id
}

fn setup() -> TestApp {
    let state = AppState::new(Database::open_in_memory().expect("in-memory database"));

    seed_principal(&state, "boss", Role::Admin, true);
    seed_principal(&state, "coord", Role::Coordinator, false);
    let rider_profile = seed_principal(&state, "rider", Role::Courier, false);
    let rider2_profile = seed_principal(&state, "rider2", Role::Courier, false);
    // An admin account whose role field was manually flipped to courier.
    seed_principal(&state, "disguised", Role::Courier, true);

    TestApp {
        app: router(Arc::new(state)),
        rider_profile,
        rider2_profile,
    }
}

fn request(method: &str, uri: &str, account: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(account) = account {
        builder = builder.header("x-account", account);
    }

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_order(app: &axum::Router, account: &str, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(request("POST", "/api/orders", Some(account), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn create_vehicle(app: &axum::Router, plate: &str) -> Value {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/vehicles",
            Some("coord"),
            Some(json!({
                "plate": plate,
                "make": "Honda",
                "model": "CB125F",
                "year": 2021
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn health_returns_ok() {
    let TestApp { app, .. } = setup();
    let response = app.oneshot(request("GET", "/health", None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
    assert_eq!(body["profiles"], 5);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let TestApp { app, .. } = setup();
    let response = app.oneshot(request("GET", "/metrics", None, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("vehicles_in_use"));
}

#[tokio::test]
async fn missing_account_header_is_unauthorized() {
    let TestApp { app, .. } = setup();
    let response = app
        .oneshot(request("GET", "/api/orders", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn unknown_account_is_unauthorized() {
    let TestApp { app, .. } = setup();
    let response = app
        .oneshot(request("GET", "/api/orders", Some("ghost"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn normal_order_defaults_to_medium_priority() {
    let TestApp { app, .. } = setup();

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Ana Martinez",
            "client_address": "Av. Providencia 123"
        }),
    )
    .await;

    assert_eq!(order["priority"], "medium");
    assert_eq!(order["order_type"], "normal");
    assert_eq!(order["status"], "prescription_pickup");
}

#[tokio::test]
async fn held_prescription_defaults_to_high_priority() {
    let TestApp { app, .. } = setup();

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Luis Fernandez",
            "client_address": "Calle Las Condes 456",
            "order_type": "held_prescription"
        }),
    )
    .await;

    assert_eq!(order["priority"], "high");
}

#[tokio::test]
async fn transfer_without_pharmacies_is_rejected_and_rolled_back() {
    let TestApp { app, .. } = setup();

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Carmen Silva",
            "client_address": "Av. Vitacura 789"
        }),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/orders/{order_id}/status"),
            Some("coord"),
            Some(json!({ "status": "transfer" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "validation");

    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/orders/{order_id}"),
            Some("coord"),
            None,
        ))
        .await
        .unwrap();
    let unchanged = body_json(response).await;
    assert_eq!(unchanged["status"], "prescription_pickup");
}

#[tokio::test]
async fn invalid_status_is_rejected() {
    let TestApp { app, .. } = setup();

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Ana",
            "client_address": "12 Elm St"
        }),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/orders/{order_id}/status"),
            Some("coord"),
            Some(json!({ "status": "teleport" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn transfer_with_pharmacies_succeeds() {
    let TestApp { app, .. } = setup();

    let origin = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/pharmacies",
            Some("coord"),
            Some(json!({ "name": "Central", "address": "1 Main St", "city": "Santiago" })),
        ))
        .await
        .unwrap();
    let origin = body_json(origin).await;
    let destination = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/pharmacies",
            Some("coord"),
            Some(json!({ "name": "North", "address": "2 Oak St", "city": "Santiago" })),
        ))
        .await
        .unwrap();
    let destination = body_json(destination).await;

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Carmen Silva",
            "client_address": "Av. Vitacura 789"
        }),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/orders/{order_id}/status"),
            Some("coord"),
            Some(json!({
                "status": "transfer",
                "origin_pharmacy_id": origin["id"],
                "destination_pharmacy_id": destination["id"]
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated = body_json(response).await;
    assert_eq!(updated["status"], "transfer");
    assert_eq!(updated["origin_pharmacy_id"], origin["id"]);
    assert_eq!(updated["destination_pharmacy_id"], destination["id"]);

    // The transition is on the audit trail.
    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/orders/{order_id}/log"),
            Some("coord"),
            None,
        ))
        .await
        .unwrap();
    let log = body_json(response).await;
    assert_eq!(log.as_array().unwrap().len(), 2);
    assert_eq!(log[0]["status"], "transfer");
}

#[tokio::test]
async fn three_attempts_number_gapless_and_latest_wins() {
    let TestApp { app, .. } = setup();

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Ana",
            "client_address": "12 Elm St"
        }),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    for (index, outcome) in ["unavailable", "error", "delivered"].iter().enumerate() {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/api/orders/{order_id}/attempts"),
                Some("coord"),
                Some(json!({ "outcome": outcome })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let attempt = body_json(response).await;
        assert_eq!(attempt["seq"], index as u64 + 1);
    }

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/orders/{order_id}"),
            Some("coord"),
            None,
        ))
        .await
        .unwrap();
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "dispatch");

    let response = app
        .oneshot(request("GET", "/api/attempts", Some("coord"), None))
        .await
        .unwrap();
    let latest = body_json(response).await;
    let rows = latest.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["seq"], 3);
    assert_eq!(rows[0]["outcome"], "delivered");
    assert_eq!(rows[0]["total_attempts"], 3);
}

#[tokio::test]
async fn pending_outcome_is_rejected() {
    let TestApp { app, .. } = setup();

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Ana",
            "client_address": "12 Elm St"
        }),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .oneshot(request(
            "POST",
            &format!("/api/orders/{order_id}/attempts"),
            Some("coord"),
            Some(json!({ "outcome": "pending" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn vehicle_reassignment_moves_the_link() {
    let test = setup();
    let app = &test.app;

    let vehicle = create_vehicle(app, "ABCD12").await;
    let vehicle_id = vehicle["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/vehicles/{vehicle_id}/assign"),
            Some("coord"),
            Some(json!({ "courier_id": test.rider_profile })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let assignment = body_json(response).await;
    assert_eq!(assignment["vehicle"]["status"], "in_use");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/vehicles/{vehicle_id}/assign"),
            Some("coord"),
            Some(json!({ "courier_id": test.rider2_profile })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let assignment = body_json(response).await;
    assert_eq!(assignment["vehicle"]["status"], "in_use");
    assert_eq!(
        assignment["vehicle"]["assigned_courier_id"],
        json!(test.rider2_profile)
    );
    assert_eq!(assignment["courier"]["vehicle_id"], json!(vehicle_id));

    // The first rider's link is gone.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/profiles/{}", test.rider_profile),
            Some("coord"),
            None,
        ))
        .await
        .unwrap();
    let first_rider = body_json(response).await;
    assert_eq!(first_rider["vehicle_id"], Value::Null);
}

#[tokio::test]
async fn courier_cannot_assign_vehicles() {
    let test = setup();

    let vehicle = create_vehicle(&test.app, "ABCD12").await;
    let vehicle_id = vehicle["id"].as_str().unwrap();

    let response = test
        .app
        .oneshot(request(
            "POST",
            &format!("/api/vehicles/{vehicle_id}/assign"),
            Some("rider"),
            Some(json!({ "courier_id": test.rider_profile })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "permission");
}

#[tokio::test]
async fn admin_account_never_appears_in_courier_pool() {
    let TestApp { app, .. } = setup();

    let response = app
        .oneshot(request("GET", "/api/couriers", Some("coord"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let pool = body_json(response).await;
    let usernames: Vec<&str> = pool
        .as_array()
        .unwrap()
        .iter()
        .map(|profile| profile["username"].as_str().unwrap())
        .collect();

    assert!(usernames.contains(&"rider"));
    assert!(usernames.contains(&"rider2"));
    // "disguised" carries the courier role on an admin account.
    assert!(!usernames.contains(&"disguised"));
}

#[tokio::test]
async fn courier_sees_only_its_own_orders() {
    let test = setup();
    let app = &test.app;

    let vehicle = create_vehicle(app, "ABCD12").await;
    let vehicle_id = vehicle["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/vehicles/{vehicle_id}/assign"),
            Some("coord"),
            Some(json!({ "courier_id": test.rider_profile })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mine = create_order(
        app,
        "coord",
        json!({
            "client_name": "Ana",
            "client_address": "12 Elm St"
        }),
    )
    .await;
    let mine_id = mine["id"].as_str().unwrap();
    create_order(
        app,
        "coord",
        json!({
            "client_name": "Luis",
            "client_address": "34 Oak St"
        }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/orders/{mine_id}/courier"),
            Some("coord"),
            Some(json!({ "courier_id": test.rider_profile })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/orders", Some("rider"), None))
        .await
        .unwrap();
    let visible = body_json(response).await;
    assert_eq!(visible.as_array().unwrap().len(), 1);
    assert_eq!(visible[0]["id"], json!(mine_id));

    // Another courier's detail access misses as not found.
    let response = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/orders/{mine_id}"),
            Some("rider2"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Staff still sees everything.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/orders", Some("coord"), None))
        .await
        .unwrap();
    let all = body_json(response).await;
    assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn courier_profile_listing_is_scoped() {
    let test = setup();

    let response = test
        .app
        .oneshot(request("GET", "/api/profiles", Some("rider"), None))
        .await
        .unwrap();
    let profiles = body_json(response).await;

    assert_eq!(profiles.as_array().unwrap().len(), 1);
    assert_eq!(profiles[0]["username"], "rider");
}

#[tokio::test]
async fn shift_change_stamps_and_clears_break() {
    let test = setup();
    let app = &test.app;
    let rider = test.rider_profile;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/profiles/{rider}/shift"),
            Some("rider"),
            Some(json!({ "shift_state": "on_break" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["profile"]["shift_state"], "on_break");
    assert!(body["profile"]["break_started_at"].is_string());

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/profiles/{rider}/shift"),
            Some("rider"),
            Some(json!({ "shift_state": "busy" })),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["profile"]["shift_state"], "busy");
    assert!(body["profile"]["break_started_at"].is_null());
}

#[tokio::test]
async fn only_admin_creates_profiles() {
    let test = setup();
    let app = &test.app;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/profiles",
            Some("coord"),
            Some(json!({ "username": "newrider" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/profiles",
            Some("boss"),
            Some(json!({ "username": "newrider", "role": "courier" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body_json(response).await;
    assert_eq!(created["username"], "newrider");
    assert_eq!(created["role"], "courier");

    // The new account can authenticate immediately.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/orders", Some("newrider"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_plate_conflicts() {
    let TestApp { app, .. } = setup();

    create_vehicle(&app, "ABCD12").await;

    let response = app
        .oneshot(request(
            "POST",
            "/api/vehicles",
            Some("coord"),
            Some(json!({
                "plate": "ABCD12",
                "make": "Suzuki",
                "model": "GN125",
                "year": 2019
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn maintenance_blocks_assignment() {
    let test = setup();
    let app = &test.app;

    let vehicle = create_vehicle(app, "ABCD12").await;
    let vehicle_id = vehicle["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/vehicles/{vehicle_id}/maintenance"),
            Some("coord"),
            Some(json!({ "notes": "chain replacement" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let flagged = body_json(response).await;
    assert_eq!(flagged["status"], "maintenance");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/vehicles/{vehicle_id}/assign"),
            Some("coord"),
            Some(json!({ "courier_id": test.rider_profile })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn dashboard_summarizes_counts() {
    let TestApp { app, .. } = setup();

    let order = create_order(
        &app,
        "coord",
        json!({
            "client_name": "Ana",
            "client_address": "12 Elm St"
        }),
    )
    .await;
    let order_id = order["id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/orders/{order_id}/attempts"),
            Some("coord"),
            Some(json!({ "outcome": "delivered" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(request("GET", "/api/dashboard", Some("coord"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let dashboard = body_json(response).await;
    assert_eq!(dashboard["total_orders"], 1);
    assert_eq!(dashboard["total_attempts"], 1);
    assert_eq!(dashboard["successful_deliveries"], 1);
    assert_eq!(dashboard["success_rate"], 100.0);
}
