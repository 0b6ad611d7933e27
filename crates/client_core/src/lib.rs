//! Client for a checkout-session REST API: session controller, request
//! builder, wizard step router and HTTP transport.

pub mod config;
pub mod controller;
pub mod error;
pub mod instruments;
pub mod request_builder;
pub mod router;
pub mod transport;

pub use config::ControllerConfig;
pub use controller::{CheckoutEvent, CheckoutSnapshot, SessionController};
pub use error::CheckoutError;
pub use instruments::{MockInstrumentProvider, PaymentInstrumentProvider};
pub use request_builder::SessionDelta;
pub use router::{Action, Step};
pub use transport::{CheckoutTransport, HttpTransport};

#[cfg(test)]
#[path = "tests/mock_server.rs"]
mod mock_server;
