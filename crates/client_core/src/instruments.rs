use shared::{
    domain::{HandlerId, InstrumentId},
    protocol::{PaymentCredential, PaymentHandler, PaymentInstrument},
};

pub const MOCK_HANDLER_ID: &str = "mock_payment_handler";
pub const MOCK_HANDLER_NAME: &str = "dev.ucp.mock_payment";
pub const SUCCESS_TOKEN: &str = "success_token";
pub const FAIL_TOKEN: &str = "fail_token";

/// Supplies the instruments a buyer may pay with for a given set of
/// merchant-accepted handlers.
pub trait PaymentInstrumentProvider: Send + Sync {
    fn instruments(&self, handlers: &[PaymentHandler]) -> Vec<PaymentInstrument>;
}

/// Fixed test cards understood by the mock payment handler. `instr_fail`
/// carries the token the handler always declines.
pub struct MockInstrumentProvider;

impl MockInstrumentProvider {
    fn card(id: &str, brand: &str, last_digits: &str, token: &str) -> PaymentInstrument {
        PaymentInstrument {
            id: InstrumentId::new(id),
            handler_id: HandlerId::new(MOCK_HANDLER_ID),
            handler_name: MOCK_HANDLER_NAME.to_string(),
            kind: "card".to_string(),
            brand: brand.to_string(),
            last_digits: last_digits.to_string(),
            credential: PaymentCredential {
                kind: "token".to_string(),
                token: token.to_string(),
            },
        }
    }

    pub fn all() -> Vec<PaymentInstrument> {
        vec![
            Self::card("instr_1", "Visa", "1234", SUCCESS_TOKEN),
            Self::card("instr_2", "Mastercard", "5678", SUCCESS_TOKEN),
            Self::card("instr_fail", "Visa", "0000", FAIL_TOKEN),
        ]
    }
}

impl PaymentInstrumentProvider for MockInstrumentProvider {
    fn instruments(&self, handlers: &[PaymentHandler]) -> Vec<PaymentInstrument> {
        // An empty handler list means the server did not advertise any; offer
        // the cards anyway and let the server reject them.
        Self::all()
            .into_iter()
            .filter(|instrument| {
                handlers.is_empty() || handlers.iter().any(|h| h.id == instrument.handler_id)
            })
            .collect()
    }
}
