mod support;

use axum::http::{Method, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use learnhub_core::domain::PromoCode;
use serde_json::{json, Value};
use std::sync::Arc;
use support::{app_state_with, app_with, plan, request, send, user, GatedPayments, InMemoryDb, PLAN_ID};

fn billing_db() -> Arc<InMemoryDb> {
    let db = Arc::new(InMemoryDb::default());
    db.with(|inner| {
        inner.plans.push(plan());
        inner.promos.push(PromoCode {
            code: "WELCOME10".into(),
            percent_off: 10,
            expires_at: None,
        });
        inner.promos.push(PromoCode {
            code: "SPRING".into(),
            percent_off: 50,
            expires_at: Some(Utc::now() - Duration::days(1)),
        });
    });
    db
}

fn card(number: &str) -> Value {
    json!({ "card": {
        "number": number,
        "exp_month": 12,
        "exp_year": 2099,
        "cvc": "123",
        "holder_name": "Ada Lovelace",
    }})
}

async fn act(router: &Router, cookie: &str, action: Value) -> (StatusCode, Value) {
    send(router, request(Method::POST, "/checkout/actions", Some(cookie), Some(action))).await
}

/// Drives a fresh wizard to the payment step with the terms accepted.
async fn to_payment(router: &Router, cookie: &str) {
    act(router, cookie, json!({ "type": "select_plan", "plan_id": PLAN_ID })).await;
    act(
        router,
        cookie,
        json!({ "type": "update_billing", "billing": {
            "full_name": "Ada Lovelace",
            "line1": "12 Analytical Way",
            "city": "London",
            "region": "Greater London",
            "postal_code": "N1 9GU",
            "country": "GB",
        }}),
    )
    .await;
    act(router, cookie, json!({ "type": "continue" })).await;
    let (status, body) = act(router, cookie, json!({ "type": "accept_terms", "accepted": true })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "payment");
}

#[tokio::test]
async fn happy_path_reaches_a_terminal_confirmation() {
    let db = billing_db();
    let (user_id, cookie) = user(&db, 1);
    let (router, _) = app_with(db.clone());

    let (status, body) = act(&router, &cookie, json!({ "type": "select_plan", "plan_id": PLAN_ID })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "billing_details");
    assert_eq!(body["step_number"], 2);
    assert_eq!(body["total_due_cents"], 4_900);

    to_payment(&router, &cookie).await;
    let (status, body) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242 4242 4242 4242"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "confirmation");
    assert_eq!(body["step_number"], 4);
    assert_eq!(body["subscription"]["amount_cents"], 4_900);
    assert_eq!(db.with(|inner| inner.subscriptions.len()), 1);
    assert_eq!(db.with(|inner| inner.subscriptions[0].user_id), user_id);

    let (status, _) = act(&router, &cookie, json!({ "type": "back" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = send(&router, request(Method::GET, "/checkout", Some(&cookie), None)).await;
    assert_eq!(body["step"], "confirmation");
}

#[tokio::test]
async fn submit_without_terms_is_refused() {
    let db = billing_db();
    let (_, cookie) = user(&db, 1);
    let (router, _) = app_with(db.clone());

    to_payment(&router, &cookie).await;
    act(&router, &cookie, json!({ "type": "accept_terms", "accepted": false })).await;
    let (status, body) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242424242424242"))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("terms"));
    assert!(db.with(|inner| inner.subscriptions.is_empty()));

    let (_, body) = send(&router, request(Method::GET, "/checkout", Some(&cookie), None)).await;
    assert_eq!(body["submitting"], false);
}

#[tokio::test]
async fn invalid_card_is_rejected_before_the_wizard_moves() {
    let db = billing_db();
    let (_, cookie) = user(&db, 1);
    let (router, _) = app_with(db);

    to_payment(&router, &cookie).await;
    let (status, body) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242 4242 4242 4241"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["number"].is_string());
}

#[tokio::test]
async fn declined_card_stays_on_payment_with_an_error() {
    let db = billing_db();
    let (_, cookie) = user(&db, 1);
    let (router, _) = app_with(db.clone());

    to_payment(&router, &cookie).await;
    let (status, body) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4000 0000 0000 0002"))),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["step"], "payment");
    assert_eq!(body["submitting"], false);
    assert_eq!(body["error"], "Your card was declined");
    assert!(db.with(|inner| inner.subscriptions.is_empty()));

    // A retry with a good card goes through.
    let (status, body) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242424242424242"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn second_submit_while_in_flight_is_refused() {
    let db = billing_db();
    let (_, cookie) = user(&db, 1);
    let payments = Arc::new(GatedPayments::default());
    let state = app_state_with(db.clone(), payments.clone());
    let router = api_lib::web::router(state);

    to_payment(&router, &cookie).await;
    let first = tokio::spawn({
        let router = router.clone();
        let cookie = cookie.clone();
        async move {
            send(
                &router,
                request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242424242424242"))),
            )
            .await
        }
    });

    loop {
        let (_, body) = send(&router, request(Method::GET, "/checkout", Some(&cookie), None)).await;
        if body["submitting"] == true {
            break;
        }
        tokio::task::yield_now().await;
    }

    let (status, _) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242424242424242"))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&router, request(Method::DELETE, "/checkout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    payments.gate.notify_one();
    let (status, body) = first.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "confirmation");
    assert_eq!(db.with(|inner| inner.subscriptions.len()), 1);
}

/// Polls `GET /checkout` until `submitting` equals `expected`.
async fn wait_for_submitting(router: &Router, cookie: &str, expected: bool) -> Value {
    loop {
        let (_, body) = send(router, request(Method::GET, "/checkout", Some(cookie), None)).await;
        if body["submitting"] == expected {
            return body;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn dropped_submit_request_still_settles_the_wizard() {
    let db = billing_db();
    let (_, cookie) = user(&db, 1);
    let payments = Arc::new(GatedPayments::default());
    let state = app_state_with(db.clone(), payments.clone());
    let router = api_lib::web::router(state);

    to_payment(&router, &cookie).await;
    let first = tokio::spawn({
        let router = router.clone();
        let cookie = cookie.clone();
        async move {
            send(
                &router,
                request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242424242424242"))),
            )
            .await
        }
    });
    wait_for_submitting(&router, &cookie, true).await;

    // The client goes away while the payment is pending.
    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    payments.gate.notify_one();
    let body = wait_for_submitting(&router, &cookie, false).await;
    assert_eq!(body["step"], "confirmation");
    assert_eq!(db.with(|inner| inner.subscriptions.len()), 1);

    let (status, _) = send(&router, request(Method::DELETE, "/checkout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);

    to_payment(&router, &cookie).await;
    payments.gate.notify_one();
    let (status, body) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242424242424242"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "confirmation");
    assert_eq!(db.with(|inner| inner.subscriptions.len()), 2);
}

#[tokio::test]
async fn confirmed_wizard_is_kept_until_reset() {
    let db = billing_db();
    let (user_id, cookie) = user(&db, 1);
    let (router, state) = app_with(db);

    to_payment(&router, &cookie).await;
    let (status, _) = send(
        &router,
        request(Method::POST, "/checkout/submit", Some(&cookie), Some(card("4242424242424242"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    {
        let checkouts = state.checkouts.lock().await;
        assert_eq!(checkouts.len(), 1);
        assert!(checkouts[&user_id].subscription.is_some());
    }

    send(&router, request(Method::DELETE, "/checkout", Some(&cookie), None)).await;
    assert!(state.checkouts.lock().await.is_empty());
}

#[tokio::test]
async fn promo_codes_discount_the_total() {
    let db = billing_db();
    let (_, cookie) = user(&db, 1);
    let (router, _) = app_with(db);
    act(&router, &cookie, json!({ "type": "select_plan", "plan_id": PLAN_ID })).await;

    let promo = |code: &str| {
        request(Method::POST, "/checkout/promo", Some(&cookie), Some(json!({ "code": code })))
    };

    let (status, body) = send(&router, promo("spring")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["code"], "This promo code has expired");

    let (status, body) = send(&router, promo("NOPE")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["code"], "Unknown promo code");

    let (status, body) = send(&router, promo(" welcome10 ")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["promo"]["code"], "WELCOME10");
    assert_eq!(body["total_due_cents"], 4_410);
}

#[tokio::test]
async fn reset_starts_over() {
    let db = billing_db();
    let (_, cookie) = user(&db, 1);
    let (router, _) = app_with(db);
    to_payment(&router, &cookie).await;

    let (status, body) = send(&router, request(Method::DELETE, "/checkout", Some(&cookie), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["step"], "select_plan");
    let (_, body) = send(&router, request(Method::GET, "/checkout", Some(&cookie), None)).await;
    assert_eq!(body["step_number"], 1);
    assert!(body["plan"].is_null());
}
