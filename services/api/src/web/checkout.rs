//! services/api/src/web/checkout.rs
//!
//! The four-step checkout wizard over HTTP. Each user's wizard state lives in
//! `AppState::checkouts` and only changes through `checkout::reduce`.

use crate::error::{ApiError, ErrorBody};
use crate::web::dto::{BillingAddressDto, CheckoutView, PaymentCardDto};
use crate::web::forms;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::Utc;
use learnhub_core::checkout::{self, AppliedPromo, CheckoutAction, CheckoutError, CheckoutState};
use learnhub_core::domain::{PaymentCard, Plan};
use learnhub_core::ports::PortError;
use learnhub_core::validation::ValidationErrors;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request Types
//=========================================================================================

/// A wizard action issued by the client.
#[derive(Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutActionRequest {
    SelectPlan { plan_id: Uuid },
    UpdateBilling { billing: BillingAddressDto },
    Continue,
    Back,
    AcceptTerms { accepted: bool },
}

#[derive(Deserialize, ToSchema)]
pub struct PromoRequest {
    pub code: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitPaymentRequest {
    pub card: PaymentCardDto,
}

//=========================================================================================
// State helpers
//=========================================================================================

/// Applies one action to the user's wizard. On error nothing is stored.
async fn dispatch(
    state: &AppState,
    user_id: Uuid,
    action: CheckoutAction,
) -> Result<CheckoutState, CheckoutError> {
    let mut checkouts = state.checkouts.lock().await;
    let current = checkouts.get(&user_id).cloned().unwrap_or_default();
    let next = checkout::reduce(current, action)?;
    checkouts.insert(user_id, next.clone());
    Ok(next)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /checkout - The user's current wizard state.
#[utoipa::path(
    get,
    path = "/checkout",
    responses((status = 200, description = "Current checkout state", body = CheckoutView)),
    tag = "Checkout"
)]
pub async fn get_checkout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Json<CheckoutView> {
    let checkouts = state.checkouts.lock().await;
    let current = checkouts.get(&user_id).cloned().unwrap_or_default();
    Json(CheckoutView::from(&current))
}

/// DELETE /checkout - Start over. Refused while a payment is in flight.
#[utoipa::path(
    delete,
    path = "/checkout",
    responses(
        (status = 200, description = "Fresh checkout state", body = CheckoutView),
        (status = 409, description = "Payment in flight", body = ErrorBody)
    ),
    tag = "Checkout"
)]
pub async fn reset_checkout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<CheckoutView>, ApiError> {
    let mut checkouts = state.checkouts.lock().await;
    if checkouts.get(&user_id).is_some_and(|c| c.submitting) {
        return Err(CheckoutError::SubmissionInFlight.into());
    }
    checkouts.remove(&user_id);
    Ok(Json(CheckoutView::from(&CheckoutState::default())))
}

/// POST /checkout/actions - Move the wizard.
#[utoipa::path(
    post,
    path = "/checkout/actions",
    request_body = CheckoutActionRequest,
    responses(
        (status = 200, description = "Updated checkout state", body = CheckoutView),
        (status = 404, description = "Unknown plan", body = ErrorBody),
        (status = 409, description = "Action not allowed on this step", body = ErrorBody)
    ),
    tag = "Checkout"
)]
pub async fn checkout_action_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CheckoutActionRequest>,
) -> Result<Json<CheckoutView>, ApiError> {
    let action = match req {
        CheckoutActionRequest::SelectPlan { plan_id } => {
            CheckoutAction::SelectPlan(state.db.get_plan(plan_id).await?)
        }
        CheckoutActionRequest::UpdateBilling { billing } => {
            CheckoutAction::UpdateBilling(billing.into())
        }
        CheckoutActionRequest::Continue => CheckoutAction::Continue,
        CheckoutActionRequest::Back => CheckoutAction::Back,
        CheckoutActionRequest::AcceptTerms { accepted } => CheckoutAction::AcceptTerms(accepted),
    };
    let next = dispatch(&state, user_id, action).await?;
    Ok(Json(CheckoutView::from(&next)))
}

/// POST /checkout/promo - Apply a promo code to the selected plan.
#[utoipa::path(
    post,
    path = "/checkout/promo",
    request_body = PromoRequest,
    responses(
        (status = 200, description = "Promo applied", body = CheckoutView),
        (status = 409, description = "Promo not allowed on this step", body = ErrorBody),
        (status = 422, description = "Unknown or expired code", body = ErrorBody)
    ),
    tag = "Checkout"
)]
pub async fn apply_promo_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<PromoRequest>,
) -> Result<Json<CheckoutView>, ApiError> {
    let code = req.code.trim();
    let mut errors = ValidationErrors::new();
    if code.is_empty() {
        errors.add("code", "Enter a promo code");
        return Err(errors.into());
    }

    let promo = match state.db.find_promo_code(code).await {
        Ok(promo) => promo,
        Err(PortError::NotFound(_)) => {
            errors.add("code", "Unknown promo code");
            return Err(errors.into());
        }
        Err(e) => {
            error!("Failed to look up promo code: {:?}", e);
            return Err(e.into());
        }
    };
    if promo.expires_at.is_some_and(|at| at <= Utc::now()) {
        errors.add("code", "This promo code has expired");
        return Err(errors.into());
    }

    let next = dispatch(
        &state,
        user_id,
        CheckoutAction::PromoApplied(AppliedPromo {
            code: promo.code,
            percent_off: promo.percent_off,
        }),
    )
    .await?;
    Ok(Json(CheckoutView::from(&next)))
}

/// POST /checkout/submit - Pay and create the subscription.
///
/// Only one submission per user can be in flight; a second one is refused
/// with 409 until the first resolves.
#[utoipa::path(
    post,
    path = "/checkout/submit",
    request_body = SubmitPaymentRequest,
    responses(
        (status = 200, description = "Subscription created; wizard confirmed", body = CheckoutView),
        (status = 402, description = "Card declined; wizard stays on payment", body = CheckoutView),
        (status = 409, description = "Terms not accepted, wrong step, or already submitting", body = ErrorBody),
        (status = 422, description = "Invalid card details", body = ErrorBody)
    ),
    tag = "Checkout"
)]
pub async fn submit_checkout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SubmitPaymentRequest>,
) -> Result<(StatusCode, Json<CheckoutView>), ApiError> {
    let card = req.card.normalized();
    forms::check_card(&card, Utc::now().date_naive())?;
    let card = PaymentCard::from(card);

    // 1. Flip the wizard into `submitting`; this is the double-submit guard.
    let started = dispatch(&state, user_id, CheckoutAction::SubmitStarted).await?;
    let Some(plan) = started.plan.clone() else {
        dispatch(&state, user_id, CheckoutAction::SubmitFailed("No plan selected".to_string())).await?;
        return Err(CheckoutError::NoPlanSelected.into());
    };

    // 2. Charge and settle in a task of its own. If this request is dropped
    //    mid-payment the task still records the outcome and clears `submitting`.
    let settle = tokio::spawn(settle_payment(state.clone(), user_id, plan, started, card));
    settle.await.map_err(|e| {
        error!("Checkout settle task for user {} failed: {:?}", user_id, e);
        ApiError::Internal("Checkout settle task failed".to_string())
    })?
}

/// Runs the payment outside the lock, then moves the wizard to confirmation
/// or back to payment with an error.
async fn settle_payment(
    state: Arc<AppState>,
    user_id: Uuid,
    plan: Plan,
    started: CheckoutState,
    card: PaymentCard,
) -> Result<(StatusCode, Json<CheckoutView>), ApiError> {
    let amount_cents = checkout::total_due_cents(&started);
    let outcome = match state
        .payments
        .create_subscription(user_id, &plan, &started.billing, &card, amount_cents)
        .await
    {
        Ok(subscription) => match state.db.save_subscription(&subscription).await {
            Ok(()) => Ok(subscription),
            Err(e) => {
                error!("Failed to save subscription {}: {:?}", subscription.id, e);
                Err(e)
            }
        },
        Err(e) => {
            warn!("Payment for user {} failed: {:?}", user_id, e);
            Err(e)
        }
    };

    let (status, action) = match outcome {
        Ok(subscription) => {
            info!("Subscription {} created for user {}", subscription.id, user_id);
            (StatusCode::OK, CheckoutAction::SubmitSucceeded(subscription))
        }
        Err(e) => {
            let status = ApiError::from(e).status();
            let message = match status {
                StatusCode::PAYMENT_REQUIRED => "Your card was declined",
                _ => "Payment could not be completed, please try again",
            };
            (status, CheckoutAction::SubmitFailed(message.to_string()))
        }
    };
    let settled = dispatch(&state, user_id, action).await?;
    Ok((status, Json(CheckoutView::from(&settled))))
}
