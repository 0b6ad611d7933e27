use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(CheckoutId);
id_newtype!(LineItemId);
id_newtype!(ProductId);
id_newtype!(MethodId);
id_newtype!(DestinationId);
id_newtype!(GroupId);
id_newtype!(OptionId);
id_newtype!(HandlerId);
id_newtype!(InstrumentId);
id_newtype!(OrderId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Incomplete,
    ReadyForComplete,
    Completed,
    Cancelled,
}

impl CheckoutStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Incomplete => "incomplete",
            Self::ReadyForComplete => "ready_for_complete",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a server-computed total. Types this client does not know about are
/// kept verbatim so they survive a render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalType {
    Subtotal,
    Discount,
    Fulfillment,
    Tax,
    Total,
    #[serde(untagged)]
    Other(String),
}

impl TotalType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subtotal => "subtotal",
            Self::Discount => "discount",
            Self::Fulfillment => "fulfillment",
            Self::Tax => "tax",
            Self::Total => "total",
            Self::Other(other) => other,
        }
    }
}

/// Fulfillment method kind. Only shipping is requested by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentKind {
    Shipping,
    Pickup,
    #[serde(untagged)]
    Other(String),
}

/// Renders an amount in minor units as `$12.34`.
pub fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
