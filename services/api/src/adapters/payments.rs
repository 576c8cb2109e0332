//! services/api/src/adapters/payments.rs
//!
//! This module contains the sandbox payment processor. It implements the
//! `PaymentProcessor` port from the `core` crate without contacting a real
//! gateway, so checkout can be exercised end to end in development.

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use learnhub_core::domain::{
    BillingAddress, BillingInterval, PaymentCard, Plan, Subscription, SubscriptionStatus,
};
use learnhub_core::ports::{PaymentProcessor, PortError, PortResult};
use tracing::{info, warn};
use uuid::Uuid;

/// Card numbers ending in these digits are always declined.
pub const DECLINED_CARD_SUFFIX: &str = "0002";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A payment processor that approves every card except the test decline card.
#[derive(Clone, Default)]
pub struct SandboxPaymentAdapter;

impl SandboxPaymentAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// The renewal date one billing interval after `started_at`.
pub fn renewal_date(started_at: DateTime<Utc>, interval: BillingInterval) -> PortResult<DateTime<Utc>> {
    let months = match interval {
        BillingInterval::Monthly => Months::new(1),
        BillingInterval::Yearly => Months::new(12),
    };
    started_at
        .checked_add_months(months)
        .ok_or_else(|| PortError::Unexpected("Renewal date out of range".to_string()))
}

//=========================================================================================
// `PaymentProcessor` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentProcessor for SandboxPaymentAdapter {
    async fn create_subscription(
        &self,
        user_id: Uuid,
        plan: &Plan,
        billing: &BillingAddress,
        card: &PaymentCard,
        amount_cents: u64,
    ) -> PortResult<Subscription> {
        let digits: String = card.number.chars().filter(char::is_ascii_digit).collect();
        if digits.ends_with(DECLINED_CARD_SUFFIX) {
            warn!(
                "Sandbox declined card ending {} for user {}",
                card.last4(),
                user_id
            );
            return Err(PortError::Declined("Your card was declined".to_string()));
        }

        let started_at = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id,
            plan_id: plan.id,
            status: SubscriptionStatus::Active,
            amount_cents,
            started_at,
            renews_at: renewal_date(started_at, plan.interval)?,
        };
        info!(
            "Sandbox charged {} cents for plan '{}' ({}) billed to {}",
            amount_cents, plan.name, subscription.id, billing.full_name
        );
        Ok(subscription)
    }
}
