//! In-process checkout server used by the transport and controller tests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    catalog,
    domain::{
        CheckoutId, CheckoutStatus, DestinationId, FulfillmentKind, GroupId, LineItemId,
        MethodId, OptionId, OrderId, TotalType,
    },
    protocol::{
        AppliedDiscount, CheckoutSession, CompleteCheckoutRequest, CreateCheckoutRequest,
        Discounts, Fulfillment, FulfillmentDestination, FulfillmentGroup, FulfillmentMethod,
        FulfillmentOption, Item, LineItem, LineItemRequest, Order, Payment, Total,
        UpdateCheckoutRequest,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

use crate::instruments::{FAIL_TOKEN, MOCK_HANDLER_ID, MOCK_HANDLER_NAME};

type Rejection = (StatusCode, Json<Value>);

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub idempotency_key: Option<String>,
    pub request_id: Option<String>,
    pub ucp_agent: Option<String>,
    pub body: Value,
}

#[derive(Default)]
pub(crate) struct MockInner {
    sessions: HashMap<String, CheckoutSession>,
    next_id: u64,
    pub requests: Vec<RecordedRequest>,
    /// When set, the cancel endpoint answers with this status.
    pub cancel_status: Option<StatusCode>,
    /// Artificial latency for update and complete calls.
    pub delay: Option<Duration>,
}

#[derive(Clone, Default)]
pub(crate) struct MockServerState {
    pub inner: Arc<Mutex<MockInner>>,
}

impl MockServerState {
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().await.requests.clone()
    }

    pub async fn last_body(&self) -> Value {
        self.inner
            .lock()
            .await
            .requests
            .last()
            .map(|r| r.body.clone())
            .unwrap_or(Value::Null)
    }

    pub async fn stored(&self, id: &str) -> Option<CheckoutSession> {
        self.inner.lock().await.sessions.get(id).cloned()
    }
}

pub(crate) async fn spawn_mock_server() -> (String, MockServerState) {
    let state = MockServerState::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let app = Router::new()
        .route("/.well-known/ucp", get(profile))
        .route("/checkout-sessions", post(create))
        .route("/checkout-sessions/:id", put(update))
        .route("/checkout-sessions/:id/complete", post(complete))
        .route("/checkout-sessions/:id/cancel", post(cancel))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (format!("http://{addr}"), state)
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn record(
    inner: &mut MockInner,
    method: &'static str,
    path: String,
    headers: &HeaderMap,
    body: Value,
) {
    inner.requests.push(RecordedRequest {
        method,
        path,
        idempotency_key: header(headers, "idempotency-key"),
        request_id: header(headers, "request-id"),
        ucp_agent: header(headers, "ucp-agent"),
        body,
    });
}

fn reject(status: StatusCode, detail: Value) -> Rejection {
    (status, Json(json!({ "detail": detail })))
}

fn bad_body(err: serde_json::Error) -> Rejection {
    reject(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!([{ "msg": err.to_string(), "loc": ["body"] }]),
    )
}

async fn profile() -> Json<Value> {
    Json(json!({
        "ucp": {
            "version": "2026-01-11",
            "capabilities": [{ "name": "dev.ucp.shopping.checkout", "version": "2026-01-11" }]
        },
        "payment": {
            "handlers": [{ "id": MOCK_HANDLER_ID, "name": MOCK_HANDLER_NAME, "config": {} }]
        }
    }))
}

async fn create(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<CheckoutSession>, Rejection> {
    let mut inner = state.inner.lock().await;
    record(
        &mut inner,
        "POST",
        "/checkout-sessions".into(),
        &headers,
        body.clone(),
    );
    let request: CreateCheckoutRequest = serde_json::from_value(body).map_err(bad_body)?;

    inner.next_id += 1;
    let id = format!("chk_{}", inner.next_id);
    let mut session = CheckoutSession {
        id: CheckoutId::new(id.clone()),
        status: CheckoutStatus::Incomplete,
        currency: request.currency,
        line_items: Vec::new(),
        totals: Vec::new(),
        buyer: Some(request.buyer),
        discounts: None,
        fulfillment: None,
        payment: Some(Payment {
            handlers: request.payment.handlers,
            instruments: Vec::new(),
            selected_instrument_id: None,
        }),
        order: None,
        messages: Vec::new(),
        expires_at: None,
    };
    session.line_items = price_line_items(&mut inner, &request.line_items, &[])?;
    reprice(&mut session);
    inner.sessions.insert(id, session.clone());
    Ok(Json(session))
}

async fn update(
    State(state): State<MockServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<CheckoutSession>, Rejection> {
    let delay = {
        let mut inner = state.inner.lock().await;
        record(
            &mut inner,
            "PUT",
            format!("/checkout-sessions/{id}"),
            &headers,
            body.clone(),
        );
        inner.delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let request: UpdateCheckoutRequest = serde_json::from_value(body).map_err(bad_body)?;
    let mut inner = state.inner.lock().await;
    let Some(previous) = inner.sessions.get(&id).cloned() else {
        return Err(reject(StatusCode::NOT_FOUND, json!("Checkout session not found")));
    };
    if matches!(
        previous.status,
        CheckoutStatus::Completed | CheckoutStatus::Cancelled
    ) {
        return Err(reject(
            StatusCode::CONFLICT,
            json!(format!("Checkout session is {}", previous.status)),
        ));
    }

    let mut session = previous.clone();
    session.line_items = price_line_items(&mut inner, &request.line_items, &previous.line_items)?;
    session.buyer = request.buyer.or(previous.buyer);
    session.discounts = request.discounts.map(|d| Discounts {
        applied: Some(applied_discounts(&d.codes)),
        codes: Some(d.codes),
    });
    session.fulfillment = match request.fulfillment {
        Some(fulfillment) => Some(build_fulfillment(&session.line_items, fulfillment)?),
        None => None,
    };
    if let Some(payment) = session.payment.as_mut() {
        payment.selected_instrument_id = request.payment.selected_instrument_id;
    }
    reprice(&mut session);
    inner.sessions.insert(id, session.clone());
    Ok(Json(session))
}

async fn complete(
    State(state): State<MockServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<CheckoutSession>, Rejection> {
    let delay = {
        let mut inner = state.inner.lock().await;
        record(
            &mut inner,
            "POST",
            format!("/checkout-sessions/{id}/complete"),
            &headers,
            body.clone(),
        );
        inner.delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let request: CompleteCheckoutRequest = serde_json::from_value(body).map_err(bad_body)?;
    let mut inner = state.inner.lock().await;
    let Some(mut session) = inner.sessions.get(&id).cloned() else {
        return Err(reject(StatusCode::NOT_FOUND, json!("Checkout session not found")));
    };
    if session.status != CheckoutStatus::ReadyForComplete {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            json!("Checkout is not ready for completion"),
        ));
    }
    if request.payment_data.credential.token == FAIL_TOKEN {
        return Err(reject(
            StatusCode::PAYMENT_REQUIRED,
            json!("Payment failed: insufficient funds"),
        ));
    }

    inner.next_id += 1;
    let order_id = format!("ord_{}", inner.next_id);
    session.status = CheckoutStatus::Completed;
    session.order = Some(Order {
        id: OrderId::new(order_id.clone()),
        permalink_url: format!("https://flowers.example/orders/{order_id}"),
    });
    if let Some(payment) = session.payment.as_mut() {
        payment.selected_instrument_id = Some(request.payment_data.id.clone());
        payment.instruments = vec![request.payment_data];
    }
    inner.sessions.insert(id, session.clone());
    Ok(Json(session))
}

async fn cancel(
    State(state): State<MockServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CheckoutSession>, Rejection> {
    let mut inner = state.inner.lock().await;
    record(
        &mut inner,
        "POST",
        format!("/checkout-sessions/{id}/cancel"),
        &headers,
        Value::Null,
    );
    if let Some(status) = inner.cancel_status {
        return Err(reject(status, json!("Cancellation unavailable")));
    }
    let Some(session) = inner.sessions.get_mut(&id) else {
        return Err(reject(StatusCode::NOT_FOUND, json!("Checkout session not found")));
    };
    session.status = CheckoutStatus::Cancelled;
    Ok(Json(session.clone()))
}

fn price_line_items(
    inner: &mut MockInner,
    requested: &[LineItemRequest],
    previous: &[LineItem],
) -> Result<Vec<LineItem>, Rejection> {
    let mut items = Vec::with_capacity(requested.len());
    for (index, line) in requested.iter().enumerate() {
        let Some(product) = catalog::find_product(line.item.id.as_str()) else {
            return Err(reject(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!([{ "msg": "unknown product", "loc": ["body", "line_items", index, "item", "id"] }]),
            ));
        };
        let id = match &line.id {
            Some(id) if previous.iter().any(|li| &li.id == id) => id.clone(),
            Some(id) => {
                return Err(reject(
                    StatusCode::BAD_REQUEST,
                    json!(format!("Unknown line item {id}")),
                ))
            }
            None => {
                inner.next_id += 1;
                LineItemId::new(format!("li_{}", inner.next_id))
            }
        };
        let amount = product.price * i64::from(line.quantity);
        items.push(LineItem {
            id,
            item: Item {
                id: product.product_id(),
                title: product.title.to_string(),
                price: Some(product.price),
                image_url: None,
            },
            quantity: line.quantity,
            totals: vec![total(TotalType::Subtotal, amount), total(TotalType::Total, amount)],
        });
    }
    Ok(items)
}

fn applied_discounts(codes: &[String]) -> Vec<AppliedDiscount> {
    // Amounts are filled in by `reprice` once the subtotal is known.
    codes
        .iter()
        .filter_map(|code| {
            let title = match code.as_str() {
                "10OFF" => "10% off",
                "WELCOME20" => "20% off your first order",
                "FIXED500" => "$5.00 off",
                _ => return None,
            };
            Some(AppliedDiscount {
                code: Some(code.clone()),
                title: title.to_string(),
                amount: 0,
                automatic: false,
            })
        })
        .collect()
}

fn destinations() -> Vec<FulfillmentDestination> {
    vec![
        FulfillmentDestination {
            id: DestinationId::new("dest_home"),
            street_address: "123 Main St".into(),
            city: "Springfield".into(),
            region: "IL".into(),
            address_country: "US".into(),
            postal_code: "62701".into(),
        },
        FulfillmentDestination {
            id: DestinationId::new("dest_office"),
            street_address: "500 Market St".into(),
            city: "San Francisco".into(),
            region: "CA".into(),
            address_country: "US".into(),
            postal_code: "94105".into(),
        },
    ]
}

fn shipping_options() -> Vec<FulfillmentOption> {
    vec![
        FulfillmentOption {
            id: OptionId::new("std"),
            title: "Standard".into(),
            totals: vec![total(TotalType::Total, 500)],
        },
        FulfillmentOption {
            id: OptionId::new("express"),
            title: "Express".into(),
            totals: vec![total(TotalType::Total, 1500)],
        },
    ]
}

fn build_fulfillment(
    line_items: &[LineItem],
    request: shared::protocol::FulfillmentRequest,
) -> Result<Fulfillment, Rejection> {
    let mut methods = Vec::new();
    for method in request.methods {
        if method.kind != FulfillmentKind::Shipping {
            return Err(reject(
                StatusCode::BAD_REQUEST,
                json!("Only shipping is supported"),
            ));
        }
        let destinations = destinations();
        if let Some(selected) = &method.selected_destination_id {
            if !destinations.iter().any(|d| &d.id == selected) {
                return Err(reject(
                    StatusCode::BAD_REQUEST,
                    json!(format!("Unknown destination {selected}")),
                ));
            }
        }
        // One shipment per line item once a destination is known.
        let groups = if method.selected_destination_id.is_some() {
            line_items
                .iter()
                .map(|li| {
                    let id = GroupId::new(format!("grp_{}", li.id));
                    let selected_option_id = method
                        .groups
                        .iter()
                        .find(|g| g.id == id)
                        .and_then(|g| g.selected_option_id.clone());
                    FulfillmentGroup {
                        id,
                        line_item_ids: vec![li.id.clone()],
                        options: shipping_options(),
                        selected_option_id,
                    }
                })
                .collect()
        } else {
            Vec::new()
        };
        methods.push(FulfillmentMethod {
            id: method.id.unwrap_or_else(|| MethodId::new("ship_1")),
            kind: FulfillmentKind::Shipping,
            line_item_ids: line_items.iter().map(|li| li.id.clone()).collect(),
            destinations,
            selected_destination_id: method.selected_destination_id,
            groups,
        });
    }
    Ok(Fulfillment { methods })
}

fn total(kind: TotalType, amount: i64) -> Total {
    Total {
        kind,
        display_text: None,
        amount,
    }
}

fn reprice(session: &mut CheckoutSession) {
    let subtotal: i64 = session
        .line_items
        .iter()
        .map(|li| li.item.price.unwrap_or_default() * i64::from(li.quantity))
        .sum();

    let mut discount = 0;
    if let Some(applied) = session.discounts.as_mut().and_then(|d| d.applied.as_mut()) {
        for entry in applied.iter_mut() {
            entry.amount = match entry.code.as_deref() {
                Some("10OFF") => subtotal / 10,
                Some("WELCOME20") => subtotal / 5,
                Some("FIXED500") => 500,
                _ => 0,
            };
            discount += entry.amount;
        }
    }
    let discount = discount.min(subtotal);

    let mut shipping = 0;
    let mut ready = false;
    if let Some(method) = session
        .fulfillment
        .as_ref()
        .and_then(|f| f.methods.first())
    {
        ready = method.selected_destination_id.is_some()
            && !method.groups.is_empty()
            && method.groups.iter().all(|g| g.selected_option_id.is_some());
        for group in &method.groups {
            let option = group
                .options
                .iter()
                .find(|o| Some(&o.id) == group.selected_option_id.as_ref());
            if let Some(option) = option {
                shipping += option.totals.iter().map(|t| t.amount).sum::<i64>();
            }
        }
    }

    session.totals = vec![
        total(TotalType::Subtotal, subtotal),
        total(TotalType::Discount, discount),
        total(TotalType::Fulfillment, shipping),
        total(TotalType::Total, subtotal - discount + shipping),
    ];
    session.status = if ready {
        CheckoutStatus::ReadyForComplete
    } else {
        CheckoutStatus::Incomplete
    };
}
