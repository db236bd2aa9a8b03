//! The request-lifecycle state machine behind every hook instance.
//!
//! # Design
//! A `RequestController` owns one logical request slot. Calls are not queued:
//! overlapping calls run concurrently and each writes the shared state when
//! it settles, so the state reflects the last call to settle. Starting a call
//! never cancels an earlier one; only `abort` does, and only for the most
//! recent call's handle.
//!
//! A successful call clears a stale `error`, so the state always describes
//! the call that settled last. This deliberately departs from hooks that keep
//! the previous error around after a later success.
//!
//! Public state lives in a `watch` channel so observers can await
//! transitions. The cancellation handle and the last raw response sit in a
//! mutex-guarded slot that is never held across an await point.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{field, Instrument};

use crate::cancel::CancellationHandle;
use crate::config::RequestInit;
use crate::env::Environment;
use crate::error::FetchError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::route::{make_route_and_options, Args, RouteAndOptions};
use crate::transport::Transport;
use crate::types::ResponseData;

/// Observable state of one hook instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestState {
    pub loading: bool,
    pub error: Option<FetchError>,
    pub data: Option<ResponseData>,
}

/// Where and how the controller sends requests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerConfig {
    pub base_url: String,
    pub init: RequestInit,
}

/// A started call. Awaiting it drives the transport and publishes the
/// outcome; dropping it leaves `loading` set until a later call settles.
pub type PendingFetch = Pin<Box<dyn Future<Output = Result<Option<ResponseData>, FetchError>> + Send + 'static>>;

/// A call that passed the request builder and owns the slot's handle.
struct Started {
    request: HttpRequest,
    handle: Option<CancellationHandle>,
}

#[derive(Debug, Default)]
struct Slot {
    config: Arc<ControllerConfig>,
    handle: Option<CancellationHandle>,
    response: Option<HttpResponse>,
}

pub struct RequestController {
    environment: Environment,
    transport: Arc<dyn Transport>,
    slot: Mutex<Slot>,
    state: watch::Sender<RequestState>,
}

impl std::fmt::Debug for RequestController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestController")
            .field("environment", &self.environment)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl RequestController {
    /// `loading` starts as `initial_loading`, which callers set when a
    /// request will fire on creation.
    pub fn new(
        config: ControllerConfig,
        environment: Environment,
        transport: Arc<dyn Transport>,
        initial_loading: bool,
    ) -> Self {
        let (state, _) = watch::channel(RequestState {
            loading: initial_loading,
            ..RequestState::default()
        });
        Self {
            environment,
            transport,
            slot: Mutex::new(Slot {
                config: Arc::new(config),
                ..Slot::default()
            }),
            state,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn config(&self) -> Arc<ControllerConfig> {
        self.slot().config.clone()
    }

    /// Replace the configuration used by calls started from now on.
    pub fn set_config(&self, config: ControllerConfig) {
        self.slot().config = Arc::new(config);
    }

    pub fn state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    /// Last raw response, if any call has completed.
    pub fn response(&self) -> Option<HttpResponse> {
        self.slot().response.clone()
    }

    /// State and last raw response read together, so `data` always belongs
    /// to the response next to it.
    pub fn snapshot(&self) -> (RequestState, Option<HttpResponse>) {
        let slot = self.slot();
        let state = self.state.borrow().clone();
        (state, slot.response.clone())
    }

    /// Whether a cancellation handle is currently installed.
    pub fn in_flight(&self) -> bool {
        self.slot().handle.is_some()
    }

    /// Signal the most recent call's handle. No-op when nothing is in flight.
    pub fn abort(&self) {
        if let Some(handle) = &self.slot().handle {
            tracing::debug!(request_id = %handle.id(), "aborting request");
            handle.abort();
        }
    }

    /// Start one call and return the future that completes it.
    ///
    /// The handle is installed and `loading` is set before this returns, so
    /// an `abort` issued before the future is first polled still cancels the
    /// call. Transport failures land in `RequestState::error`; cancellation
    /// is silent. The future resolves to the state's `data` after settling.
    /// `Err` is only returned for arguments the request builder rejects.
    pub fn dispatch(self: &Arc<Self>, method: HttpMethod, args: Args) -> PendingFetch {
        let span = tracing::debug_span!("fetch", method = %method, request_id = field::Empty);
        let started = span.in_scope(|| self.start(method, args));
        let controller = self.clone();
        Box::pin(
            async move {
                match started {
                    Ok(started) => Ok(controller.complete(started).await),
                    Err(err) => Err(err),
                }
            }
            .instrument(span),
        )
    }

    fn start(&self, method: HttpMethod, args: Args) -> Result<Started, FetchError> {
        let config = self.config();
        let handle = self.environment.is_browser().then(CancellationHandle::new);
        if let Some(handle) = &handle {
            tracing::Span::current().record("request_id", field::display(handle.id()));
        }

        let RouteAndOptions { route, options } =
            make_route_and_options(&config.init, method, handle.clone(), args)?;

        self.slot().handle = handle.clone();
        self.state.send_modify(|state| state.loading = true);

        Ok(Started {
            request: options.into_request(&config.base_url, &route),
            handle,
        })
    }

    async fn complete(&self, started: Started) -> Option<ResponseData> {
        let Started { request, handle } = started;

        if self.environment.is_server() {
            tracing::debug!("server environment, skipping transport call");
            self.settle(handle.as_ref());
            return None;
        }

        tracing::debug!(url = %request.url, "sending request");
        let outcome = match &handle {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.aborted() => Err(FetchError::Cancelled),
                result = self.transport.send(request) => result,
            },
            None => self.transport.send(request).await,
        };

        match outcome {
            Ok(response) => {
                tracing::debug!(status = response.status, "request settled");
                let data = ResponseData::decode(&response.body);
                let mut slot = self.slot();
                slot.response = Some(response);
                self.state.send_modify(|state| {
                    state.data = Some(data);
                    state.error = None;
                });
            }
            Err(err) if err.is_cancelled() => {
                tracing::debug!("request aborted");
            }
            Err(err) => {
                tracing::warn!(error = %err, "request failed");
                self.state.send_modify(|state| state.error = Some(err));
            }
        }

        self.settle(handle.as_ref());
        self.state.borrow().data.clone()
    }

    /// Runs on every exit path after the call started: drop our handle from
    /// the slot and clear `loading`.
    fn settle(&self, handle: Option<&CancellationHandle>) {
        {
            let mut slot = self.slot();
            let ours = match (&slot.handle, handle) {
                (Some(current), Some(handle)) => current.id() == handle.id(),
                (_, None) => true,
                (None, Some(_)) => false,
            };
            if ours {
                slot.handle = None;
            }
        }
        self.state.send_modify(|state| state.loading = false);
    }
}
