//! Owner of the single in-memory checkout session.
//!
//! Every mutation restates the session through the request builder, waits for
//! the server and then swaps in the returned document wholesale. On failure
//! the previous session and step are kept and the error becomes the current
//! error message.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use shared::{
    catalog,
    domain::{CheckoutStatus, DestinationId, GroupId, OptionId, ProductId},
    protocol::{CheckoutSession, MerchantProfile, PaymentInstrument},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    config::ControllerConfig,
    error::{CheckoutError, Result},
    instruments::{MockInstrumentProvider, PaymentInstrumentProvider},
    request_builder::{self, SessionDelta},
    router::{self, Action, Step},
    transport::{CheckoutTransport, HttpTransport},
};

#[derive(Debug, Clone)]
pub enum CheckoutEvent {
    SessionUpdated(Box<CheckoutSession>),
    StepChanged(Step),
    Error(String),
    Cleared,
}

/// Point-in-time view of the controller for rendering.
#[derive(Debug, Clone)]
pub struct CheckoutSnapshot {
    pub step: Step,
    pub session: Option<CheckoutSession>,
    pub profile: Option<MerchantProfile>,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Default)]
struct ControllerState {
    profile: Option<MerchantProfile>,
    session: Option<CheckoutSession>,
    step: Step,
    error: Option<String>,
    /// Bumped whenever the session is discarded so late responses can be dropped.
    generation: u64,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SessionController {
    transport: Arc<dyn CheckoutTransport>,
    instruments: Arc<dyn PaymentInstrumentProvider>,
    config: ControllerConfig,
    inner: Mutex<ControllerState>,
    in_flight: AtomicBool,
    events: broadcast::Sender<CheckoutEvent>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn CheckoutTransport>, config: ControllerConfig) -> Self {
        Self::new_with_instrument_provider(transport, Arc::new(MockInstrumentProvider), config)
    }

    pub fn new_with_instrument_provider(
        transport: Arc<dyn CheckoutTransport>,
        instruments: Arc<dyn PaymentInstrumentProvider>,
        config: ControllerConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            transport,
            instruments,
            config,
            inner: Mutex::new(ControllerState::default()),
            in_flight: AtomicBool::new(false),
            events,
        }
    }

    /// Controller talking HTTP to the checkout server at `server_url`.
    pub fn connect(server_url: &str, config: ControllerConfig) -> Result<Self> {
        let transport = HttpTransport::new(server_url, &config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CheckoutEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> CheckoutSnapshot {
        let state = self.inner.lock().await;
        CheckoutSnapshot {
            step: state.step,
            session: state.session.clone(),
            profile: state.profile.clone(),
            error: state.error.clone(),
            loading: self.in_flight.load(Ordering::Acquire),
        }
    }

    pub async fn step(&self) -> Step {
        self.inner.lock().await.step
    }

    pub async fn session(&self) -> Option<CheckoutSession> {
        self.inner.lock().await.session.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.error.clone()
    }

    /// Instruments offered for the handlers the current session (or, before a
    /// session exists, the merchant profile) accepts.
    pub async fn available_instruments(&self) -> Vec<PaymentInstrument> {
        let state = self.inner.lock().await;
        let handlers = state
            .session
            .as_ref()
            .and_then(|s| s.payment.as_ref())
            .map(|p| p.handlers.as_slice())
            .filter(|handlers| !handlers.is_empty())
            .or_else(|| state.profile.as_ref().map(|p| p.payment.handlers.as_slice()))
            .unwrap_or_default();
        self.instruments.instruments(handlers)
    }

    pub async fn discover(&self) -> Result<MerchantProfile> {
        let _guard = self.begin().await?;
        self.inner.lock().await.error = None;
        match self.fetch_profile().await {
            Ok(profile) => Ok(profile),
            Err(err) => Err(self.record_failure(err).await),
        }
    }

    /// Catalog entry point: opens a session on the first add, increments or
    /// appends afterwards.
    pub async fn add_to_cart(&self, product_id: &str) -> Result<CheckoutSession> {
        let Some(product) = catalog::find_product(product_id) else {
            return Err(self
                .record_failure(CheckoutError::UnknownProduct(product_id.to_string()))
                .await);
        };
        if self.inner.lock().await.session.is_none() {
            self.start(product.id, 1).await
        } else {
            self.add_or_increment_item(product.product_id(), product.title)
                .await
        }
    }

    pub async fn start(&self, product_id: &str, quantity: u32) -> Result<CheckoutSession> {
        let _guard = self.begin().await?;
        let Some(product) = catalog::find_product(product_id) else {
            return Err(self
                .record_failure(CheckoutError::UnknownProduct(product_id.to_string()))
                .await);
        };

        let generation = {
            let mut state = self.inner.lock().await;
            state.error = None;
            if state.session.is_some() {
                drop(state);
                return Err(self.record_failure(CheckoutError::SessionInProgress).await);
            }
            if !router::allows(state.step, Action::AddToCart) {
                let err = CheckoutError::StepNotAllowed {
                    action: Action::AddToCart,
                    step: state.step,
                };
                drop(state);
                return Err(self.record_failure(err).await);
            }
            state.generation
        };

        let result = async {
            let cached = self.inner.lock().await.profile.clone();
            let profile = match cached {
                Some(profile) => profile,
                None => self.fetch_profile().await?,
            };
            let body = request_builder::create_request(
                product.product_id(),
                product.title,
                quantity,
                &self.config,
                &profile.payment.handlers,
            );
            self.with_timeout(self.transport.create_checkout(&body))
                .await
        }
        .await;

        if let Ok(session) = &result {
            info!(checkout_id = %session.id, product_id, "checkout session created");
        }
        self.finish(generation, Action::AddToCart, result).await
    }

    pub async fn add_or_increment_item(
        &self,
        product_id: ProductId,
        title: impl Into<String>,
    ) -> Result<CheckoutSession> {
        self.update(
            Action::AddToCart,
            SessionDelta::AddItem {
                product_id,
                title: title.into(),
            },
        )
        .await
    }

    /// Appends `code` to the requested codes; the server decides whether it applies.
    pub async fn apply_discount(&self, code: impl Into<String>) -> Result<CheckoutSession> {
        self.update(Action::ApplyDiscount, SessionDelta::ApplyDiscount(code.into()))
            .await
    }

    pub async fn request_fulfillment_options(&self) -> Result<CheckoutSession> {
        self.update(Action::ProceedToFulfillment, SessionDelta::RequestShipping)
            .await
    }

    pub async fn select_destination(
        &self,
        destination_id: DestinationId,
    ) -> Result<CheckoutSession> {
        self.update(
            Action::SelectDestination,
            SessionDelta::SelectDestination(destination_id),
        )
        .await
    }

    pub async fn select_shipping_option(
        &self,
        group_id: GroupId,
        option_id: OptionId,
    ) -> Result<CheckoutSession> {
        self.update(
            Action::SelectShippingOption,
            SessionDelta::SelectShippingOption {
                group_id,
                option_id,
            },
        )
        .await
    }

    pub async fn complete_payment(&self, instrument: PaymentInstrument) -> Result<CheckoutSession> {
        let _guard = self.begin().await?;
        let (session, generation) = self.prepare(Action::CompletePayment).await?;

        let body = request_builder::complete_request(instrument, &self.config);
        let result = self
            .with_timeout(self.transport.complete_checkout(&session.id, &body))
            .await
            .map_err(CheckoutError::into_payment)
            .and_then(|completed| {
                if completed.status == CheckoutStatus::Completed {
                    Ok(completed)
                } else {
                    Err(CheckoutError::Payment(
                        completed
                            .first_error_message()
                            .unwrap_or("payment was not completed")
                            .to_string(),
                    ))
                }
            });

        if let Ok(completed) = &result {
            info!(
                checkout_id = %completed.id,
                order_id = ?completed.order.as_ref().map(|o| o.id.to_string()),
                "checkout completed"
            );
        }
        self.finish(generation, Action::CompletePayment, result).await
    }

    /// Drops the local session and returns to the catalog. The server is told
    /// on a best-effort basis; failures are logged and never surfaced.
    pub async fn cancel(&self) {
        let Some(session) = self.clear(Action::Cancel).await else {
            return;
        };
        if session.status == CheckoutStatus::Completed {
            return;
        }
        let outcome = self
            .with_timeout(self.transport.cancel_checkout(&session.id))
            .await;
        match outcome {
            Ok(()) => info!(checkout_id = %session.id, "checkout cancelled"),
            Err(err) => {
                let ignored = CheckoutError::CancelIgnored(err.to_string());
                warn!(checkout_id = %session.id, error = %ignored, "cancel request failed");
            }
        }
    }

    pub async fn start_over(&self) {
        self.clear(Action::StartOver).await;
    }

    pub async fn continue_shopping(&self) -> Result<Step> {
        self.navigate(Action::ContinueShopping).await
    }

    pub async fn proceed_to_payment(&self) -> Result<Step> {
        self.navigate(Action::ProceedToPayment).await
    }

    pub async fn back(&self) -> Result<Step> {
        self.navigate(Action::Back).await
    }

    async fn navigate(&self, action: Action) -> Result<Step> {
        let _guard = self.begin().await?;
        let mut state = self.inner.lock().await;
        if !router::allows(state.step, action) {
            return Err(CheckoutError::StepNotAllowed {
                action,
                step: state.step,
            });
        }
        let next = router::resolve(
            router::next_step(state.step, action),
            state.session.is_some(),
        );
        state.error = None;
        if next != state.step {
            state.step = next;
            let _ = self.events.send(CheckoutEvent::StepChanged(next));
        }
        Ok(next)
    }

    async fn update(&self, action: Action, delta: SessionDelta) -> Result<CheckoutSession> {
        let _guard = self.begin().await?;
        let (session, generation) = self.prepare(action).await?;

        let result = match request_builder::update_request(&session, &delta) {
            Ok(body) => {
                debug!(checkout_id = %session.id, ?delta, "updating checkout");
                self.with_timeout(self.transport.update_checkout(&session.id, &body))
                    .await
            }
            Err(err) => Err(err),
        };

        self.finish(generation, action, result).await
    }

    async fn begin(&self) -> Result<InFlightGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(self.record_failure(CheckoutError::Busy).await);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    /// Checks the step gate and hands out a copy of the session to build from.
    async fn prepare(&self, action: Action) -> Result<(CheckoutSession, u64)> {
        let mut state = self.inner.lock().await;
        state.error = None;
        let err = match (&state.session, router::allows(state.step, action)) {
            (Some(session), true) => return Ok((session.clone(), state.generation)),
            (None, _) => CheckoutError::NoSession,
            (Some(_), false) => CheckoutError::StepNotAllowed {
                action,
                step: state.step,
            },
        };
        state.error = Some(err.to_string());
        let _ = self.events.send(CheckoutEvent::Error(err.to_string()));
        Err(err)
    }

    /// Applies the outcome of a request issued for session `generation`.
    /// Outcomes for a session that was cleared in the meantime are dropped.
    async fn finish(
        &self,
        generation: u64,
        action: Action,
        result: Result<CheckoutSession>,
    ) -> Result<CheckoutSession> {
        let mut state = self.inner.lock().await;
        if state.generation != generation {
            warn!(%action, "discarding response for a cleared session");
            return Err(CheckoutError::NoSession);
        }
        let session = match result.and_then(|session| {
            session
                .check_order_invariant()
                .map_err(CheckoutError::MalformedResponse)?;
            Ok(session)
        }) {
            Ok(session) => session,
            Err(err) => {
                drop(state);
                return Err(self.record_failure(err).await);
            }
        };

        state.session = Some(session.clone());
        state.error = None;
        let _ = self
            .events
            .send(CheckoutEvent::SessionUpdated(Box::new(session.clone())));

        let next = router::next_step(state.step, action);
        if next != state.step {
            debug!(from = %state.step, to = %next, "step changed");
            state.step = next;
            let _ = self.events.send(CheckoutEvent::StepChanged(next));
        }
        Ok(session)
    }

    async fn record_failure(&self, err: CheckoutError) -> CheckoutError {
        let message = err.to_string();
        debug!(error = %message, "checkout operation failed");
        self.inner.lock().await.error = Some(message.clone());
        let _ = self.events.send(CheckoutEvent::Error(message));
        err
    }

    async fn clear(&self, action: Action) -> Option<CheckoutSession> {
        let mut state = self.inner.lock().await;
        state.generation += 1;
        state.error = None;
        state.step = router::next_step(state.step, action);
        let session = state.session.take();
        let _ = self.events.send(CheckoutEvent::Cleared);
        session
    }

    async fn fetch_profile(&self) -> Result<MerchantProfile> {
        let profile = self.with_timeout(self.transport.fetch_profile()).await?;
        info!(version = %profile.ucp.version, "merchant profile loaded");
        self.inner.lock().await.profile = Some(profile.clone());
        Ok(profile)
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.config.request_timeout, fut)
            .await
            .map_err(|_| CheckoutError::Timeout(self.config.request_timeout))?
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
