//! crates/learnhub_core/src/checkout.rs
//!
//! The four-step checkout wizard as a reducer over explicit actions.
//!
//! Forward movement: SelectPlan -> BillingDetails -> Payment -> Confirmation.
//! `Back` walks one step towards SelectPlan. Confirmation is terminal.

use crate::domain::{BillingAddress, Plan, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckoutStep {
    SelectPlan,
    BillingDetails,
    Payment,
    Confirmation,
}

impl CheckoutStep {
    /// The 1-based step number shown in the progress indicator.
    pub fn number(self) -> u8 {
        match self {
            CheckoutStep::SelectPlan => 1,
            CheckoutStep::BillingDetails => 2,
            CheckoutStep::Payment => 3,
            CheckoutStep::Confirmation => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutStep::SelectPlan => "select_plan",
            CheckoutStep::BillingDetails => "billing_details",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Confirmation => "confirmation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedPromo {
    pub code: String,
    pub percent_off: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutState {
    pub step: CheckoutStep,
    pub plan: Option<Plan>,
    pub billing: BillingAddress,
    pub terms_accepted: bool,
    pub promo: Option<AppliedPromo>,
    /// True while the subscription call is in flight; disables submit and back.
    pub submitting: bool,
    pub error: Option<String>,
    pub subscription: Option<Subscription>,
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self {
            step: CheckoutStep::SelectPlan,
            plan: None,
            billing: BillingAddress::default(),
            terms_accepted: false,
            promo: None,
            submitting: false,
            error: None,
            subscription: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutAction {
    SelectPlan(Plan),
    UpdateBilling(BillingAddress),
    Continue,
    Back,
    AcceptTerms(bool),
    PromoApplied(AppliedPromo),
    SubmitStarted,
    SubmitSucceeded(Subscription),
    SubmitFailed(String),
}

impl CheckoutAction {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutAction::SelectPlan(_) => "select_plan",
            CheckoutAction::UpdateBilling(_) => "update_billing",
            CheckoutAction::Continue => "continue",
            CheckoutAction::Back => "back",
            CheckoutAction::AcceptTerms(_) => "accept_terms",
            CheckoutAction::PromoApplied(_) => "promo_applied",
            CheckoutAction::SubmitStarted => "submit_started",
            CheckoutAction::SubmitSucceeded(_) => "submit_succeeded",
            CheckoutAction::SubmitFailed(_) => "submit_failed",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Checkout is already confirmed")]
    Terminal,
    #[error("The terms must be accepted before submitting")]
    TermsNotAccepted,
    #[error("A payment submission is already in progress")]
    SubmissionInFlight,
    #[error("No plan has been selected")]
    NoPlanSelected,
    #[error("Action '{action}' is not allowed on step '{}'", .step.as_str())]
    InvalidTransition {
        step: CheckoutStep,
        action: &'static str,
    },
}

/// Applies one action. On error the caller keeps its previous state.
pub fn reduce(state: CheckoutState, action: CheckoutAction) -> Result<CheckoutState, CheckoutError> {
    use CheckoutAction as A;
    use CheckoutStep as S;

    if state.step == S::Confirmation {
        return Err(CheckoutError::Terminal);
    }

    match (state.step, action) {
        (S::SelectPlan, A::SelectPlan(plan)) => Ok(CheckoutState {
            step: S::BillingDetails,
            plan: Some(plan),
            promo: None,
            ..state
        }),
        (S::SelectPlan, A::Continue) => match state.plan {
            Some(_) => Ok(CheckoutState {
                step: S::BillingDetails,
                ..state
            }),
            None => Err(CheckoutError::NoPlanSelected),
        },
        (S::SelectPlan, A::Back) => Ok(state),

        (S::BillingDetails, A::UpdateBilling(billing)) => Ok(CheckoutState { billing, ..state }),
        (S::BillingDetails, A::Continue) => Ok(CheckoutState {
            step: S::Payment,
            ..state
        }),
        (S::BillingDetails, A::Back) => Ok(CheckoutState {
            step: S::SelectPlan,
            ..state
        }),
        (S::BillingDetails, A::PromoApplied(promo)) => Ok(CheckoutState {
            promo: Some(promo),
            ..state
        }),

        // Everything but the outcome of the in-flight call waits for it.
        (S::Payment, A::SubmitSucceeded(subscription)) if state.submitting => Ok(CheckoutState {
            step: S::Confirmation,
            submitting: false,
            error: None,
            subscription: Some(subscription),
            ..state
        }),
        (S::Payment, A::SubmitFailed(message)) if state.submitting => Ok(CheckoutState {
            submitting: false,
            error: Some(message),
            ..state
        }),
        (S::Payment, A::SubmitStarted | A::Back | A::AcceptTerms(_) | A::PromoApplied(_))
            if state.submitting =>
        {
            Err(CheckoutError::SubmissionInFlight)
        }

        (S::Payment, A::AcceptTerms(terms_accepted)) => Ok(CheckoutState {
            terms_accepted,
            ..state
        }),
        (S::Payment, A::PromoApplied(promo)) => Ok(CheckoutState {
            promo: Some(promo),
            ..state
        }),
        (S::Payment, A::Back) => Ok(CheckoutState {
            step: S::BillingDetails,
            ..state
        }),
        (S::Payment, A::SubmitStarted) if !state.terms_accepted => Err(CheckoutError::TermsNotAccepted),
        (S::Payment, A::SubmitStarted) => Ok(CheckoutState {
            submitting: true,
            error: None,
            ..state
        }),

        (step, action) => Err(CheckoutError::InvalidTransition {
            step,
            action: action.name(),
        }),
    }
}

/// Plan price after any promo discount.
pub fn total_due_cents(state: &CheckoutState) -> u64 {
    let Some(plan) = &state.plan else {
        return 0;
    };
    let discount = state
        .promo
        .as_ref()
        .map_or(0, |p| plan.price_cents * u64::from(p.percent_off.min(100)) / 100);
    plan.price_cents.saturating_sub(discount)
}
