use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::ControllerConfig;
use shared::protocol::{Buyer, RiskSignals};

pub const DEFAULT_CONFIG_FILE: &str = "storefront.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_url: String,
    pub currency: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub request_timeout_secs: u64,
    pub agent_profile: String,
    /// Browser name reported in the risk signals sent with payment.
    pub risk_browser: String,
}

impl Default for Settings {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        Self {
            server_url: "http://localhost:8182".into(),
            currency: controller.currency,
            buyer_name: controller.buyer.full_name.unwrap_or_default(),
            buyer_email: controller.buyer.email.unwrap_or_default(),
            request_timeout_secs: controller.request_timeout.as_secs(),
            agent_profile: controller.agent_profile,
            risk_browser: controller.risk_signals.browser,
        }
    }
}

impl Settings {
    pub fn controller_config(&self) -> ControllerConfig {
        let defaults = ControllerConfig::default();
        ControllerConfig {
            currency: self.currency.clone(),
            buyer: Buyer {
                full_name: Some(self.buyer_name.clone()),
                email: Some(self.buyer_email.clone()),
            },
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            agent_profile: self.agent_profile.clone(),
            risk_signals: RiskSignals {
                browser: self.risk_browser.clone(),
                ..defaults.risk_signals
            },
            ..defaults
        }
    }
}

/// Defaults, then the flat `key = "value"` file at `path` if present, then
/// the environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?;
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;

    if let Some(v) = file_cfg.get("server_url") {
        settings.server_url = v.clone();
    }
    if let Some(v) = file_cfg.get("currency") {
        settings.currency = v.clone();
    }
    if let Some(v) = file_cfg.get("buyer_name") {
        settings.buyer_name = v.clone();
    }
    if let Some(v) = file_cfg.get("buyer_email") {
        settings.buyer_email = v.clone();
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        settings.request_timeout_secs = v
            .parse()
            .with_context(|| format!("request_timeout_secs must be a number, got '{v}'"))?;
    }
    if let Some(v) = file_cfg.get("agent_profile") {
        settings.agent_profile = v.clone();
    }
    if let Some(v) = file_cfg.get("risk_browser") {
        settings.risk_browser = v.clone();
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("STOREFRONT_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__CURRENCY") {
        settings.currency = v;
    }
    if let Some(v) = var("APP__BUYER_NAME") {
        settings.buyer_name = v;
    }
    if let Some(v) = var("APP__BUYER_EMAIL") {
        settings.buyer_email = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = var("APP__AGENT_PROFILE") {
        settings.agent_profile = v;
    }
    if let Some(v) = var("APP__RISK_BROWSER") {
        settings.risk_browser = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
