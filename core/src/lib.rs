//! Fire-and-reflect HTTP requests for UI components.
//!
//! # Overview
//! `use_fetch` creates one hook instance: a `RequestController` that owns a
//! single logical request slot, a method table bound to it (`get`, `post`,
//! `patch`, `put`, `del`/`delete`, GraphQL `query`/`mutate`, `abort`), and
//! two views of its state, a named-field `FetchResult` and an ordered
//! `FetchTuple`.
//!
//! # Design
//! - Failures are observed through `RequestState::error`, never through the
//!   return value of a verb. Aborted calls leave no error behind.
//! - Response bodies are decoded as JSON, falling back to text.
//! - The network sits behind the `Transport` trait; `ReqwestTransport` is the
//!   default and tests inject scripted ones.
//! - Configuration is layered: `FetchContext` defaults, then the first
//!   argument, then overrides.

pub mod cancel;
pub mod config;
pub mod controller;
pub mod env;
pub mod error;
pub mod hook;
pub mod http;
pub mod request;
pub mod route;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use cancel::CancellationHandle;
pub use config::{Credentials, FetchContext, FetchOptions, RequestInit, ResolvedConfig, UrlOrOptions};
pub use controller::{ControllerConfig, PendingFetch, RequestController, RequestState};
pub use env::Environment;
pub use error::FetchError;
pub use hook::{use_fetch, FetchResult, FetchTuple, Response, UseFetch, UseFetchBuilder};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{BoundMethod, FetchOutcome, Request};
pub use route::{make_route_and_options, Args, RouteAndOptions, RouteOrBody};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Body, ResponseData};
