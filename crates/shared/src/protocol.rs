use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CheckoutId, CheckoutStatus, DestinationId, FulfillmentKind, GroupId, HandlerId, InstrumentId,
    LineItemId, MethodId, OptionId, OrderId, ProductId, TotalType,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Total {
    #[serde(rename = "type")]
    pub kind: TotalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    pub amount: i64,
}

/// Looks up the amount of the first total of `kind`.
pub fn total_amount(totals: &[Total], kind: &TotalType) -> Option<i64> {
    totals.iter().find(|t| &t.kind == kind).map(|t| t.amount)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ProductId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub item: Item,
    pub quantity: u32,
    #[serde(default)]
    pub totals: Vec<Total>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub title: String,
    pub amount: i64,
    #[serde(default)]
    pub automatic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discounts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<Vec<AppliedDiscount>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentDestination {
    pub id: DestinationId,
    pub street_address: String,
    pub city: String,
    pub region: String,
    pub address_country: String,
    pub postal_code: String,
}

impl FulfillmentDestination {
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {} {}, {}",
            self.street_address, self.city, self.region, self.postal_code, self.address_country
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentOption {
    pub id: OptionId,
    pub title: String,
    #[serde(default)]
    pub totals: Vec<Total>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentGroup {
    pub id: GroupId,
    #[serde(default)]
    pub line_item_ids: Vec<LineItemId>,
    #[serde(default)]
    pub options: Vec<FulfillmentOption>,
    #[serde(default)]
    pub selected_option_id: Option<OptionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentMethod {
    pub id: MethodId,
    #[serde(rename = "type")]
    pub kind: FulfillmentKind,
    #[serde(default)]
    pub line_item_ids: Vec<LineItemId>,
    #[serde(default)]
    pub destinations: Vec<FulfillmentDestination>,
    #[serde(default)]
    pub selected_destination_id: Option<DestinationId>,
    #[serde(default)]
    pub groups: Vec<FulfillmentGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fulfillment {
    #[serde(default)]
    pub methods: Vec<FulfillmentMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHandler {
    pub id: HandlerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCredential {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInstrument {
    pub id: InstrumentId,
    pub handler_id: HandlerId,
    pub handler_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub brand: String,
    pub last_digits: String,
    pub credential: PaymentCredential,
}

impl PaymentInstrument {
    pub fn label(&self) -> String {
        format!("{} •••• {}", self.brand, self.last_digits)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub handlers: Vec<PaymentHandler>,
    #[serde(default)]
    pub instruments: Vec<PaymentInstrument>,
    #[serde(default)]
    pub selected_instrument_id: Option<InstrumentId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub permalink_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Error,
    Warning,
    Info,
}

/// Server advisory attached to a checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutId,
    pub status: CheckoutStatus,
    pub currency: String,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub totals: Vec<Total>,
    #[serde(default)]
    pub buyer: Option<Buyer>,
    #[serde(default)]
    pub discounts: Option<Discounts>,
    #[serde(default)]
    pub fulfillment: Option<Fulfillment>,
    #[serde(default)]
    pub payment: Option<Payment>,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CheckoutSession {
    pub fn total(&self, kind: &TotalType) -> Option<i64> {
        total_amount(&self.totals, kind)
    }

    pub fn requested_codes(&self) -> &[String] {
        self.discounts
            .as_ref()
            .and_then(|d| d.codes.as_deref())
            .unwrap_or_default()
    }

    pub fn shipping_method(&self) -> Option<&FulfillmentMethod> {
        self.fulfillment
            .as_ref()?
            .methods
            .iter()
            .find(|m| m.kind == FulfillmentKind::Shipping)
    }

    pub fn first_error_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.kind == MessageKind::Error)
            .map(|m| m.content.as_str())
    }

    /// A completed session must carry an order and no other status may.
    pub fn check_order_invariant(&self) -> Result<(), String> {
        match (self.status, self.order.is_some()) {
            (CheckoutStatus::Completed, false) => {
                Err(format!("session {} is completed but has no order", self.id))
            }
            (status, true) if status != CheckoutStatus::Completed => Err(format!(
                "session {} carries an order while {}",
                self.id, status
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UcpVersionInfo {
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePayment {
    #[serde(default)]
    pub handlers: Vec<PaymentHandler>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub ucp: UcpVersionInfo,
    #[serde(default)]
    pub payment: ProfilePayment,
}

// Request bodies.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: ProductId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LineItemId>,
    pub item: ItemRef,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub instruments: Vec<PaymentInstrument>,
    pub handlers: Vec<PaymentHandler>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_instrument_id: Option<InstrumentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    pub line_items: Vec<LineItemRequest>,
    pub buyer: Buyer,
    pub currency: String,
    pub payment: PaymentRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountsRequest {
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSelection {
    pub id: GroupId,
    pub selected_option_id: Option<OptionId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MethodId>,
    #[serde(rename = "type")]
    pub kind: FulfillmentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_destination_id: Option<DestinationId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentRequest {
    pub methods: Vec<MethodRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCheckoutRequest {
    pub id: CheckoutId,
    pub line_items: Vec<LineItemRequest>,
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<Buyer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounts: Option<DiscountsRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment: Option<FulfillmentRequest>,
    pub payment: PaymentRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSignals {
    pub ip: String,
    pub browser: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteCheckoutRequest {
    pub payment_data: PaymentInstrument,
    pub risk_signals: RiskSignals,
}
