//! The method table: one callable per verb, bound to a controller.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::controller::{PendingFetch, RequestController, RequestState};
use crate::error::FetchError;
use crate::http::HttpMethod;
use crate::route::Args;
use crate::types::{Body, GraphQlMutation, GraphQlQuery, ResponseData};

/// Result of a verb call: the state's data after the call settled.
pub type FetchOutcome = Result<Option<ResponseData>, FetchError>;

/// A verb bound to a controller.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    method: HttpMethod,
    controller: Arc<RequestController>,
}

impl BoundMethod {
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn call(&self, args: impl Into<Args>) -> PendingFetch {
        self.controller.dispatch(self.method, args.into())
    }
}

/// Request handle exposing every verb plus GraphQL sugar and `abort`.
///
/// Cheap to clone; all clones drive the same controller. A verb starts its
/// call before returning, so `abort` right after it cancels that call even
/// if the returned future has not been polled yet.
#[derive(Debug, Clone)]
pub struct Request {
    controller: Arc<RequestController>,
}

impl Request {
    pub(crate) fn new(controller: Arc<RequestController>) -> Self {
        Self { controller }
    }

    pub(crate) fn controller(&self) -> &Arc<RequestController> {
        &self.controller
    }

    /// The table entry for `method`.
    pub fn method(&self, method: HttpMethod) -> BoundMethod {
        BoundMethod {
            method,
            controller: self.controller.clone(),
        }
    }

    /// All five bound verbs in table order.
    pub fn methods(&self) -> [BoundMethod; 5] {
        HttpMethod::ALL.map(|method| self.method(method))
    }

    pub fn get(&self, args: impl Into<Args>) -> PendingFetch {
        self.controller.dispatch(HttpMethod::Get, args.into())
    }

    pub fn post(&self, args: impl Into<Args>) -> PendingFetch {
        self.controller.dispatch(HttpMethod::Post, args.into())
    }

    pub fn patch(&self, args: impl Into<Args>) -> PendingFetch {
        self.controller.dispatch(HttpMethod::Patch, args.into())
    }

    pub fn put(&self, args: impl Into<Args>) -> PendingFetch {
        self.controller.dispatch(HttpMethod::Put, args.into())
    }

    pub fn del(&self, args: impl Into<Args>) -> PendingFetch {
        self.controller.dispatch(HttpMethod::Delete, args.into())
    }

    /// Alias of `del`.
    pub fn delete(&self, args: impl Into<Args>) -> PendingFetch {
        self.del(args)
    }

    /// POST `{query, variables}`.
    pub fn query(&self, query: &str, variables: Option<Value>) -> PendingFetch {
        self.post_payload(Body::json(&GraphQlQuery { query, variables }))
    }

    /// POST `{mutation, variables}`.
    pub fn mutate(&self, mutation: &str, variables: Option<Value>) -> PendingFetch {
        self.post_payload(Body::json(&GraphQlMutation { mutation, variables }))
    }

    fn post_payload(&self, body: Result<Body, FetchError>) -> PendingFetch {
        match body {
            Ok(body) => self.post(body),
            Err(err) => Box::pin(std::future::ready(Err(err))),
        }
    }

    pub fn abort(&self) {
        self.controller.abort();
    }

    pub fn state(&self) -> RequestState {
        self.controller.state()
    }

    pub fn loading(&self) -> bool {
        self.controller.state().loading
    }

    pub fn error(&self) -> Option<FetchError> {
        self.controller.state().error
    }

    pub fn data(&self) -> Option<ResponseData> {
        self.controller.state().data
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.controller.subscribe()
    }
}
