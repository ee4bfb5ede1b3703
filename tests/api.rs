mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use pension::adapters::{PensionPlanRepository, UserRepository, WithdrawalRepository};
use pension::domain::{Money, Withdrawal};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{config, test_app, test_app_with, PGBL_CONTRACT, USER_KEY, VGBL_CONTRACT};

async fn send(router: Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_withdrawal(user_key: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/users/{}/withdrawals", user_key))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn balance_reports_yield_and_grace() {
    let t = test_app();
    let (status, body) = send(
        t.app.router(),
        get(&format!("/users/{}/balance/{}", USER_KEY, PGBL_CONTRACT)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total"], "R$ 9600.00");
    assert_eq!(json["available"], "R$ 5000.00");
    assert_eq!(json["notAvailable"], "R$ 3600.00");
    assert_eq!(json["graces"].as_array().unwrap().len(), 1);
    assert_eq!(json["graces"][0]["value"], "R$ 3600.00");
    assert_eq!(t.cache.len(), 1);
}

#[tokio::test]
async fn balance_for_unknown_user_or_contract_is_404() {
    let t = test_app();

    let (status, body) = send(t.app.router(), get("/users/000/balance/12345")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "User not found");

    let (status, body) = send(
        t.app.router(),
        get(&format!("/users/{}/balance/00000", USER_KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        "This contract number does not exist or is not related to this Pension Plan"
    );
}

#[tokio::test]
async fn withdrawal_request_is_pending_and_visible_in_status() {
    let t = test_app();
    let (status, body) = send(
        t.app.router(),
        post_withdrawal(
            USER_KEY,
            json!({ "requestedValue": 1000, "contractNumber": PGBL_CONTRACT }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "PENDING");
    assert_eq!(json["requestedValue"], 100000);
    assert_eq!(json["redeemableValue"], 85000);
    assert!(json.get("rejectionReason").is_none());

    let tx = json["transactionId"].as_str().unwrap().to_string();
    let (status, body) = send(t.app.router(), get(&format!("/status/{}", tx))).await;
    assert_eq!(status, StatusCode::OK);
    let history: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "PENDING");
    assert_eq!(history[0]["transactionId"], tx.as_str());
}

#[tokio::test]
async fn vgbl_withdrawal_within_contributions_is_untaxed() {
    let t = test_app();
    let (status, body) = send(
        t.app.router(),
        post_withdrawal(
            USER_KEY,
            json!({ "requestedValue": 1500.50, "contractNumber": VGBL_CONTRACT }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["requestedValue"], 150050);
    assert_eq!(json["redeemableValue"], 150050);
}

#[tokio::test]
async fn withdrawal_above_available_is_rejected() {
    let t = test_app();
    let (status, body) = send(
        t.app.router(),
        post_withdrawal(
            USER_KEY,
            json!({ "requestedValue": 5000.01, "contractNumber": PGBL_CONTRACT }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "REJECTED");
    assert_eq!(json["redeemableValue"], 500000);
    assert_eq!(
        json["rejectionReason"],
        "Requested value is higher than the available"
    );
}

#[tokio::test]
async fn negative_withdrawal_is_400() {
    let t = test_app();
    let (status, _) = send(
        t.app.router(),
        post_withdrawal(
            USER_KEY,
            json!({ "requestedValue": -10, "contractNumber": PGBL_CONTRACT }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn withdrawal_for_unknown_user_is_404() {
    let t = test_app();
    let (status, body) = send(
        t.app.router(),
        post_withdrawal(
            "nobody",
            json!({ "requestedValue": 10, "contractNumber": PGBL_CONTRACT }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "User not found");
}

#[tokio::test]
async fn status_rejects_bad_ids_and_unknown_transactions() {
    let t = test_app();

    let (status, _) = send(t.app.router(), get("/status/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        t.app.router(),
        get(&format!("/status/{}", uuid::Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Transactions not found");
}

#[tokio::test]
async fn health_reports_version() {
    let t = test_app();
    let (status, body) = send(t.app.router(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json["uptimeSeconds"].as_i64().unwrap() >= 0);
}

#[tokio::test]
async fn configured_yield_rate_applies_to_in_memory_plans() {
    let mut config = config();
    config.plan.yield_rate = dec!(0.10);
    let t = test_app_with(config);

    let (status, body) = send(
        t.app.router(),
        get(&format!("/users/{}/balance/{}", USER_KEY, PGBL_CONTRACT)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total"], "R$ 8800.00");
    assert_eq!(json["available"], "R$ 5000.00");
    assert_eq!(json["notAvailable"], "R$ 3300.00");
}

#[tokio::test]
async fn metrics_endpoint_exports_request_counters() {
    let t = test_app();
    send(
        t.app.router(),
        post_withdrawal(
            USER_KEY,
            json!({ "requestedValue": 99999, "contractNumber": PGBL_CONTRACT }),
        ),
    )
    .await;

    let response = t.app.router().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(
        "pension_withdrawals_requested_total{status=\"REJECTED\",reason=\"insufficient_funds\"} 1\n"
    ));
    assert!(text.contains("pension_withdrawals_requested_total{status=\"PENDING\"} 0\n"));
}

#[tokio::test]
async fn balance_of_overdrawn_plan_is_a_server_error() {
    let t = test_app();
    let user = t.store.find_by_key(USER_KEY).await.unwrap().unwrap();
    let plan = t
        .store
        .find_by_user_and_contract(user.id, PGBL_CONTRACT)
        .await
        .unwrap()
        .unwrap();
    let pending = Withdrawal::pending(
        plan.id,
        Money::from_minor_units(700000).unwrap(),
        Money::from_minor_units(600000).unwrap(),
        Utc::now(),
    );
    t.store.append(&pending).await.unwrap();
    t.store.append(&pending.confirm(Utc::now()).unwrap()).await.unwrap();

    let (status, _) = send(
        t.app.router(),
        get(&format!("/users/{}/balance/{}", USER_KEY, PGBL_CONTRACT)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(t.cache.is_empty());
}
