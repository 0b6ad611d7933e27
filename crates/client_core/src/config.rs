use std::time::Duration;

use shared::protocol::{Buyer, RiskSignals};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_AGENT_PROFILE: &str = "http://localhost:5173/profile";

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub currency: String,
    pub buyer: Buyer,
    pub request_timeout: Duration,
    pub risk_signals: RiskSignals,
    /// Sent as `UCP-Agent: profile="<url>"`.
    pub agent_profile: String,
    pub request_signature: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            buyer: Buyer {
                full_name: Some("John Doe".into()),
                email: Some("john.doe@example.com".into()),
            },
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            risk_signals: RiskSignals {
                ip: "127.0.0.1".into(),
                browser: "chrome".into(),
            },
            agent_profile: DEFAULT_AGENT_PROFILE.into(),
            request_signature: "test".into(),
        }
    }
}
