//! Request bodies for the checkout endpoints.
//!
//! The update endpoint treats its body as the complete desired state: a line
//! item, discount code or fulfillment selection that is left out is removed.
//! Every update body therefore restates the current session and applies one
//! [`SessionDelta`] on top.

use shared::{
    domain::{DestinationId, FulfillmentKind, GroupId, OptionId, ProductId},
    protocol::{
        CheckoutSession, CompleteCheckoutRequest, CreateCheckoutRequest, DiscountsRequest,
        FulfillmentRequest, GroupSelection, ItemRef, LineItemRequest, MethodRequest,
        PaymentHandler, PaymentInstrument, PaymentRequest, UpdateCheckoutRequest,
    },
};

use crate::{
    config::ControllerConfig,
    error::{CheckoutError, Result},
};

/// The single change an update request carries on top of the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDelta {
    Unchanged,
    AddItem {
        product_id: ProductId,
        title: String,
    },
    ApplyDiscount(String),
    RequestShipping,
    SelectDestination(DestinationId),
    SelectShippingOption {
        group_id: GroupId,
        option_id: OptionId,
    },
}

pub fn create_request(
    product_id: ProductId,
    title: impl Into<String>,
    quantity: u32,
    config: &ControllerConfig,
    handlers: &[PaymentHandler],
) -> CreateCheckoutRequest {
    CreateCheckoutRequest {
        line_items: vec![LineItemRequest {
            id: None,
            item: ItemRef {
                id: product_id,
                title: title.into(),
            },
            quantity,
        }],
        buyer: config.buyer.clone(),
        currency: config.currency.clone(),
        payment: PaymentRequest {
            instruments: Vec::new(),
            handlers: handlers.to_vec(),
            selected_instrument_id: None,
        },
    }
}

pub fn update_request(
    session: &CheckoutSession,
    delta: &SessionDelta,
) -> Result<UpdateCheckoutRequest> {
    Ok(UpdateCheckoutRequest {
        id: session.id.clone(),
        line_items: line_items(session, delta),
        currency: session.currency.clone(),
        buyer: session.buyer.clone(),
        discounts: discounts(session, delta),
        fulfillment: fulfillment(session, delta)?,
        payment: PaymentRequest {
            instruments: Vec::new(),
            handlers: Vec::new(),
            selected_instrument_id: session
                .payment
                .as_ref()
                .and_then(|p| p.selected_instrument_id.clone()),
        },
    })
}

pub fn complete_request(
    instrument: PaymentInstrument,
    config: &ControllerConfig,
) -> CompleteCheckoutRequest {
    CompleteCheckoutRequest {
        payment_data: instrument,
        risk_signals: config.risk_signals.clone(),
    }
}

fn line_items(session: &CheckoutSession, delta: &SessionDelta) -> Vec<LineItemRequest> {
    let mut items: Vec<LineItemRequest> = session
        .line_items
        .iter()
        .map(|li| LineItemRequest {
            id: Some(li.id.clone()),
            item: ItemRef {
                id: li.item.id.clone(),
                title: li.item.title.clone(),
            },
            quantity: li.quantity,
        })
        .collect();

    if let SessionDelta::AddItem { product_id, title } = delta {
        match items.iter_mut().find(|li| &li.item.id == product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(1),
            None => items.push(LineItemRequest {
                id: None,
                item: ItemRef {
                    id: product_id.clone(),
                    title: title.clone(),
                },
                quantity: 1,
            }),
        }
    }
    items
}

fn discounts(session: &CheckoutSession, delta: &SessionDelta) -> Option<DiscountsRequest> {
    let mut codes = session.discounts.as_ref().map(|_| DiscountsRequest {
        codes: session.requested_codes().to_vec(),
    });
    if let SessionDelta::ApplyDiscount(code) = delta {
        codes
            .get_or_insert_with(|| DiscountsRequest { codes: Vec::new() })
            .codes
            .push(code.clone());
    }
    codes
}

fn fulfillment(
    session: &CheckoutSession,
    delta: &SessionDelta,
) -> Result<Option<FulfillmentRequest>> {
    let mut request = session.fulfillment.as_ref().map(|f| FulfillmentRequest {
        methods: f
            .methods
            .iter()
            .map(|m| MethodRequest {
                id: Some(m.id.clone()),
                kind: m.kind.clone(),
                selected_destination_id: m.selected_destination_id.clone(),
                groups: m
                    .groups
                    .iter()
                    .map(|g| GroupSelection {
                        id: g.id.clone(),
                        selected_option_id: g.selected_option_id.clone(),
                    })
                    .collect(),
            })
            .collect(),
    });

    match delta {
        SessionDelta::RequestShipping => {
            let methods = &mut request
                .get_or_insert_with(|| FulfillmentRequest {
                    methods: Vec::new(),
                })
                .methods;
            if !methods.iter().any(|m| m.kind == FulfillmentKind::Shipping) {
                methods.push(MethodRequest {
                    id: None,
                    kind: FulfillmentKind::Shipping,
                    selected_destination_id: None,
                    groups: Vec::new(),
                });
            }
        }
        SessionDelta::SelectDestination(destination_id) => {
            shipping_method(&mut request)?.selected_destination_id = Some(destination_id.clone());
        }
        SessionDelta::SelectShippingOption {
            group_id,
            option_id,
        } => {
            let group = shipping_method(&mut request)?
                .groups
                .iter_mut()
                .find(|g| &g.id == group_id)
                .ok_or_else(|| CheckoutError::UnknownGroup(group_id.to_string()))?;
            group.selected_option_id = Some(option_id.clone());
        }
        SessionDelta::Unchanged | SessionDelta::AddItem { .. } | SessionDelta::ApplyDiscount(_) => {}
    }
    Ok(request)
}

fn shipping_method(request: &mut Option<FulfillmentRequest>) -> Result<&mut MethodRequest> {
    request
        .as_mut()
        .and_then(|f| {
            f.methods
                .iter_mut()
                .find(|m| m.kind == FulfillmentKind::Shipping)
        })
        .ok_or(CheckoutError::NoShippingMethod)
}

#[cfg(test)]
#[path = "tests/request_builder_tests.rs"]
mod tests;
