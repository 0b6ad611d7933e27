//! Wizard step sequencing: `catalog → cart → fulfillment → payment → confirmed`.
//!
//! The router only gates what the storefront offers at each step. Whether a
//! transition is legal for the checkout itself is decided by the server.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Step {
    #[default]
    Catalog,
    Cart,
    Fulfillment,
    Payment,
    Confirmed,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Cart => "cart",
            Self::Fulfillment => "fulfillment",
            Self::Payment => "payment",
            Self::Confirmed => "confirmed",
        }
    }

    pub fn requires_session(self) -> bool {
        self != Self::Catalog
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    AddToCart,
    ApplyDiscount,
    ContinueShopping,
    ProceedToFulfillment,
    SelectDestination,
    SelectShippingOption,
    ProceedToPayment,
    Back,
    CompletePayment,
    Cancel,
    StartOver,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddToCart => "add to cart",
            Self::ApplyDiscount => "apply discount",
            Self::ContinueShopping => "continue shopping",
            Self::ProceedToFulfillment => "proceed to fulfillment",
            Self::SelectDestination => "select destination",
            Self::SelectShippingOption => "select shipping option",
            Self::ProceedToPayment => "proceed to payment",
            Self::Back => "back",
            Self::CompletePayment => "complete payment",
            Self::Cancel => "cancel",
            Self::StartOver => "start over",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `action` is offered on `step`.
pub fn allows(step: Step, action: Action) -> bool {
    use Action::*;
    match action {
        StartOver => true,
        AddToCart => matches!(step, Step::Catalog | Step::Cart),
        ApplyDiscount | ContinueShopping | ProceedToFulfillment => step == Step::Cart,
        SelectDestination | SelectShippingOption | ProceedToPayment => step == Step::Fulfillment,
        Back => matches!(step, Step::Fulfillment | Step::Payment),
        CompletePayment => step == Step::Payment,
        Cancel => step != Step::Confirmed,
    }
}

/// The step reached once `action` succeeds on `step`.
pub fn next_step(step: Step, action: Action) -> Step {
    use Action::*;
    match action {
        AddToCart => Step::Cart,
        ContinueShopping => Step::Catalog,
        ProceedToFulfillment => Step::Fulfillment,
        ProceedToPayment => Step::Payment,
        CompletePayment => Step::Confirmed,
        Cancel | StartOver => Step::Catalog,
        Back => match step {
            Step::Payment => Step::Fulfillment,
            Step::Fulfillment => Step::Cart,
            other => other,
        },
        ApplyDiscount | SelectDestination | SelectShippingOption => step,
    }
}

/// Steps other than the catalog are only reachable with a session in memory.
pub fn resolve(step: Step, has_session: bool) -> Step {
    if step.requires_session() && !has_session {
        Step::Catalog
    } else {
        step
    }
}
