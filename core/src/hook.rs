//! `use_fetch`: configure a controller, optionally fire on creation, and
//! expose its state as a named-field view and an ordered view.
//!
//! # Design
//! Both views are built from one `RequestController::snapshot`, so `data`,
//! `loading`, `error` and the raw response always agree. The auto-fire call
//! is spawned on the current tokio runtime when the instance is created and
//! again only when reconfiguration changes the verb, the body, or turns
//! auto-fire on.

use std::ops::Deref;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{build_init, resolve, FetchContext, FetchOptions, RequestInit, UrlOrOptions};
use crate::controller::{ControllerConfig, RequestController};
use crate::env::Environment;
use crate::error::FetchError;
use crate::http::{HttpMethod, HttpResponse};
use crate::request::{FetchOutcome, Request};
use crate::route::Args;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{Body, ResponseData};

/// Create a hook instance with the default context, environment and
/// transport. Auto-fire needs a running tokio runtime.
pub fn use_fetch(
    url_or_options: impl Into<UrlOrOptions>,
    overrides: Option<FetchOptions>,
) -> Result<UseFetch, FetchError> {
    UseFetch::builder(url_or_options).overrides(overrides).build()
}

/// The last raw response together with the decoded data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    raw: Option<HttpResponse>,
    pub data: Option<ResponseData>,
}

impl Response {
    pub fn raw(&self) -> Option<&HttpResponse> {
        self.raw.as_ref()
    }

    pub fn status(&self) -> Option<u16> {
        self.raw.as_ref().map(|raw| raw.status)
    }

    /// `false` until a 2xx response has arrived.
    pub fn ok(&self) -> bool {
        self.raw.as_ref().is_some_and(HttpResponse::ok)
    }

    pub fn headers(&self) -> &[(String, String)] {
        self.raw.as_ref().map(|raw| raw.headers.as_slice()).unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw.as_ref()?.header(name)
    }
}

/// Ordered view: `(request, response, loading, error)`.
pub type FetchTuple = (Request, Response, bool, Option<FetchError>);

/// Named-field view of a hook instance at one point in time.
///
/// Derefs to `Request`, so verbs can be called on it directly.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub request: Request,
    pub response: Response,
    pub data: Option<ResponseData>,
    pub loading: bool,
    pub error: Option<FetchError>,
}

impl FetchResult {
    pub fn into_tuple(self) -> FetchTuple {
        self.into()
    }
}

impl From<FetchResult> for FetchTuple {
    fn from(result: FetchResult) -> Self {
        (result.request, result.response, result.loading, result.error)
    }
}

impl Deref for FetchResult {
    type Target = Request;

    fn deref(&self) -> &Request {
        &self.request
    }
}

/// What the auto-fire call depends on.
#[derive(Debug, Clone, PartialEq)]
struct MountKey {
    on_mount: bool,
    method: HttpMethod,
    body: Option<Body>,
}

impl MountKey {
    fn new(on_mount: bool, init: &RequestInit) -> Self {
        Self {
            on_mount,
            method: init.method.unwrap_or(HttpMethod::Get),
            body: init.body.clone(),
        }
    }
}

/// One hook instance.
#[derive(Debug)]
pub struct UseFetch {
    request: Request,
    context: FetchContext,
    mount_key: MountKey,
    mount_task: Option<JoinHandle<FetchOutcome>>,
}

impl UseFetch {
    pub fn builder(url_or_options: impl Into<UrlOrOptions>) -> UseFetchBuilder {
        UseFetchBuilder {
            url_or_options: url_or_options.into(),
            overrides: None,
            context: None,
            environment: Environment::default(),
            transport: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Named-field view of the current state.
    pub fn current(&self) -> FetchResult {
        let (state, raw) = self.request.controller().snapshot();
        FetchResult {
            request: self.request.clone(),
            response: Response {
                raw,
                data: state.data.clone(),
            },
            data: state.data,
            loading: state.loading,
            error: state.error,
        }
    }

    /// Ordered view of the current state.
    pub fn tuple(&self) -> FetchTuple {
        self.current().into()
    }

    /// Wait for the pending auto-fire call, if one was started and not yet
    /// awaited.
    ///
    /// Only the latest auto-fire call is tracked. When `reconfigure` fires
    /// again while an earlier call is still running, that call keeps running
    /// detached and its outcome is only visible through the shared state.
    pub async fn mounted(&mut self) -> Option<FetchOutcome> {
        let task = self.mount_task.take()?;
        match task.await {
            Ok(outcome) => Some(outcome),
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => None,
        }
    }

    /// Apply a new configuration. State is kept. The auto-fire call runs
    /// again only if it is enabled and its verb, body or flag changed.
    pub fn reconfigure(
        &mut self,
        url_or_options: impl Into<UrlOrOptions>,
        overrides: Option<FetchOptions>,
    ) -> Result<(), FetchError> {
        let url_or_options = url_or_options.into();
        let resolved = resolve(&url_or_options, overrides.as_ref(), &self.context)?;
        let init = build_init(&url_or_options, overrides.as_ref(), &self.context);
        let key = MountKey::new(resolved.on_mount, &init);

        self.request.controller().set_config(ControllerConfig {
            base_url: resolved.base_url,
            init,
        });

        let refire = key.on_mount && key != self.mount_key;
        self.mount_key = key;
        if refire {
            self.fire_on_mount()?;
        }
        Ok(())
    }

    fn fire_on_mount(&mut self) -> Result<(), FetchError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| FetchError::NoRuntime)?;
        let method = self.request.method(self.mount_key.method);
        let args = match self.mount_key.method {
            HttpMethod::Get => Args::none(),
            _ => Args::from(self.mount_key.body.clone()),
        };
        tracing::debug!(method = %method.method(), "auto-firing request");
        self.mount_task = Some(runtime.spawn(method.call(args)));
        Ok(())
    }
}

pub struct UseFetchBuilder {
    url_or_options: UrlOrOptions,
    overrides: Option<FetchOptions>,
    context: Option<FetchContext>,
    environment: Environment,
    transport: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for UseFetchBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UseFetchBuilder")
            .field("url_or_options", &self.url_or_options)
            .field("overrides", &self.overrides)
            .field("context", &self.context)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl UseFetchBuilder {
    pub fn overrides(mut self, overrides: Option<FetchOptions>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Global defaults. Without one, `FetchContext::from_env` is used.
    pub fn context(mut self, context: FetchContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<UseFetch, FetchError> {
        let context = self.context.unwrap_or_else(FetchContext::from_env);
        let resolved = resolve(&self.url_or_options, self.overrides.as_ref(), &context)?;
        let init = build_init(&self.url_or_options, self.overrides.as_ref(), &context);
        let mount_key = MountKey::new(resolved.on_mount, &init);
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()) as Arc<dyn Transport>);

        let controller = RequestController::new(
            ControllerConfig {
                base_url: resolved.base_url,
                init,
            },
            self.environment,
            transport,
            resolved.on_mount,
        );

        let mut hook = UseFetch {
            request: Request::new(Arc::new(controller)),
            context,
            mount_key,
            mount_task: None,
        };
        if hook.mount_key.on_mount {
            hook.fire_on_mount()?;
        }
        Ok(hook)
    }
}
