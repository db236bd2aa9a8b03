//! Turns a method call's arguments into a route and transport options.
//!
//! # Design
//! Every verb accepts "route, body, both, or nothing". `Args` captures that
//! shape with `From` impls so call sites read `get("/users/1")`,
//! `post(json!({..}))` or `put(("/users/1", json!({..})))`.
//! `make_route_and_options` then applies the merged `RequestInit`: body
//! precedence, content type and credentials.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::cancel::CancellationHandle;
use crate::config::{Credentials, RequestInit};
use crate::error::FetchError;
use crate::http::{HttpMethod, HttpRequest};
use crate::types::Body;

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";
const APPLICATION_JSON: &str = "application/json";

/// First argument of a verb call: a sub-path or the request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOrBody {
    Route(String),
    Body(Body),
}

/// Arguments of a verb call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub route_or_body: Option<RouteOrBody>,
    pub body: Option<Body>,
}

impl Args {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn route(route: impl Into<String>) -> Self {
        Self {
            route_or_body: Some(RouteOrBody::Route(route.into())),
            body: None,
        }
    }

    pub fn body(body: impl Into<Body>) -> Self {
        Self {
            route_or_body: Some(RouteOrBody::Body(body.into())),
            body: None,
        }
    }

    pub fn route_and_body(route: impl Into<String>, body: impl Into<Body>) -> Self {
        Self {
            route_or_body: Some(RouteOrBody::Route(route.into())),
            body: Some(body.into()),
        }
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Args::none()
    }
}

impl From<&str> for Args {
    fn from(route: &str) -> Self {
        Args::route(route)
    }
}

impl From<String> for Args {
    fn from(route: String) -> Self {
        Args::route(route)
    }
}

impl From<Value> for Args {
    fn from(body: Value) -> Self {
        Args::body(body)
    }
}

impl From<Body> for Args {
    fn from(body: Body) -> Self {
        Args::body(body)
    }
}

impl From<Option<Body>> for Args {
    fn from(body: Option<Body>) -> Self {
        body.map(Args::body).unwrap_or_default()
    }
}

impl<B: Into<Body>> From<(&str, B)> for Args {
    fn from((route, body): (&str, B)) -> Self {
        Args::route_and_body(route, body)
    }
}

impl<B: Into<Body>> From<(String, B)> for Args {
    fn from((route, body): (String, B)) -> Self {
        Args::route_and_body(route, body)
    }
}

/// Finalized transport options for one call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub signal: Option<CancellationHandle>,
}

impl RequestOptions {
    /// Join with the base URL into a plain request.
    pub fn into_request(self, base_url: &str, route: &str) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: format!("{base_url}{route}"),
            headers: self.headers,
            body: self.body,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteAndOptions {
    pub route: String,
    pub options: RequestOptions,
}

/// Build the route and options for one call.
///
/// A body as first argument cannot be followed by a second one.
pub fn make_route_and_options(
    init: &RequestInit,
    method: HttpMethod,
    signal: Option<CancellationHandle>,
    args: Args,
) -> Result<RouteAndOptions, FetchError> {
    let (route, body) = match args.route_or_body {
        Some(RouteOrBody::Route(route)) => (route, args.body),
        Some(RouteOrBody::Body(body)) => {
            if args.body.is_some() {
                return Err(FetchError::InvalidArguments(
                    "a body as first argument cannot be followed by a second body".to_string(),
                ));
            }
            (String::new(), Some(body))
        }
        None => {
            if args.body.is_some() {
                return Err(FetchError::InvalidArguments(
                    "a second argument requires a route as first argument".to_string(),
                ));
            }
            (String::new(), None)
        }
    };
    // GET never picks up the configured default body.
    let body = match method {
        HttpMethod::Get => body,
        _ => body.or_else(|| init.body.clone()),
    };

    let mut headers = init.headers.clone();
    let has_content_type = headers.keys().any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE));
    let json_body = body.as_ref().is_some_and(Body::is_json);
    if !has_content_type && (matches!(method, HttpMethod::Post | HttpMethod::Put) || json_body) {
        headers.insert(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string());
    }
    if let Some(credentials) = &init.credentials {
        set_authorization(&mut headers, credentials);
    }

    let body = body.as_ref().map(Body::encode).transpose()?;

    Ok(RouteAndOptions {
        route,
        options: RequestOptions {
            method,
            headers: headers.into_iter().collect(),
            body,
            signal,
        },
    })
}

fn set_authorization(headers: &mut BTreeMap<String, String>, credentials: &Credentials) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(AUTHORIZATION));
    let value = match credentials {
        Credentials::Bearer(token) => format!("Bearer {token}"),
        Credentials::Basic { username, password } => {
            format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
        }
    };
    headers.insert(AUTHORIZATION.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header<'a>(options: &'a RequestOptions, name: &str) -> Option<&'a str> {
        options
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn route_only() {
        let built = make_route_and_options(&RequestInit::default(), HttpMethod::Get, None, "/users/1".into()).unwrap();
        assert_eq!(built.route, "/users/1");
        assert!(built.options.body.is_none());
        assert!(built.options.headers.is_empty());
    }

    #[test]
    fn body_as_first_argument_has_empty_route() {
        let built =
            make_route_and_options(&RequestInit::default(), HttpMethod::Post, None, json!({"name": "a"}).into()).unwrap();
        assert_eq!(built.route, "");
        assert_eq!(built.options.body.as_deref(), Some(r#"{"name":"a"}"#));
        assert_eq!(header(&built.options, "content-type"), Some("application/json"));
    }

    #[test]
    fn route_and_body() {
        let built = make_route_and_options(
            &RequestInit::default(),
            HttpMethod::Patch,
            None,
            ("/users/1", json!({"name": "b"})).into(),
        )
        .unwrap();
        assert_eq!(built.route, "/users/1");
        assert_eq!(built.options.body.as_deref(), Some(r#"{"name":"b"}"#));
    }

    #[test]
    fn body_followed_by_body_is_rejected() {
        let args = Args {
            route_or_body: Some(RouteOrBody::Body(json!(1).into())),
            body: Some(json!(2).into()),
        };
        let err = make_route_and_options(&RequestInit::default(), HttpMethod::Post, None, args).unwrap_err();
        assert!(matches!(err, FetchError::InvalidArguments(_)));
    }

    #[test]
    fn init_body_is_the_fallback() {
        let init = RequestInit {
            body: Some(Body::Text("from-init".to_string())),
            ..RequestInit::default()
        };
        let built = make_route_and_options(&init, HttpMethod::Delete, None, Args::none()).unwrap();
        assert_eq!(built.options.body.as_deref(), Some("from-init"));
        assert_eq!(header(&built.options, "content-type"), None);
    }

    #[test]
    fn string_body_argument_is_sent_as_text() {
        let built =
            make_route_and_options(&RequestInit::default(), HttpMethod::Patch, None, ("/form", "a=1&b=2").into())
                .unwrap();
        assert_eq!(built.route, "/form");
        assert_eq!(built.options.body.as_deref(), Some("a=1&b=2"));
        assert_eq!(header(&built.options, "content-type"), None);
    }

    #[test]
    fn get_ignores_init_body() {
        let init = RequestInit {
            body: Some(Body::Json(json!({"default": true}))),
            ..RequestInit::default()
        };
        let built = make_route_and_options(&init, HttpMethod::Get, None, Args::none()).unwrap();
        assert!(built.options.body.is_none());
        assert!(built.options.headers.is_empty());
    }

    #[test]
    fn post_and_put_default_to_json_content_type() {
        for method in [HttpMethod::Post, HttpMethod::Put] {
            let built = make_route_and_options(&RequestInit::default(), method, None, Args::none()).unwrap();
            assert_eq!(header(&built.options, "Content-Type"), Some("application/json"));
        }
    }

    #[test]
    fn configured_content_type_is_kept() {
        let mut init = RequestInit::default();
        init.headers.insert("content-type".to_string(), "text/plain".to_string());
        let built = make_route_and_options(&init, HttpMethod::Post, None, Args::none()).unwrap();
        assert_eq!(built.options.headers, vec![("content-type".to_string(), "text/plain".to_string())]);
    }

    #[test]
    fn bearer_credentials_become_authorization() {
        let init = RequestInit {
            credentials: Some(Credentials::Bearer("abc".to_string())),
            ..RequestInit::default()
        };
        let built = make_route_and_options(&init, HttpMethod::Get, None, Args::none()).unwrap();
        assert_eq!(header(&built.options, "authorization"), Some("Bearer abc"));
    }

    #[test]
    fn basic_credentials_are_base64_encoded() {
        let mut init = RequestInit {
            credentials: Some(Credentials::Basic {
                username: "user".to_string(),
                password: "pass".to_string(),
            }),
            ..RequestInit::default()
        };
        init.headers.insert("authorization".to_string(), "stale".to_string());
        let built = make_route_and_options(&init, HttpMethod::Get, None, Args::none()).unwrap();
        assert_eq!(
            built.options.headers,
            vec![("Authorization".to_string(), "Basic dXNlcjpwYXNz".to_string())]
        );
    }

    #[test]
    fn signal_is_carried_into_options() {
        let handle = CancellationHandle::new();
        let built =
            make_route_and_options(&RequestInit::default(), HttpMethod::Get, Some(handle.clone()), Args::none()).unwrap();
        assert_eq!(built.options.signal.map(|s| s.id()), Some(handle.id()));
    }

    #[test]
    fn into_request_joins_base_and_route() {
        let built = make_route_and_options(&RequestInit::default(), HttpMethod::Get, None, "/users/1".into()).unwrap();
        let request = built.options.into_request("https://api.example.com", &built.route);
        assert_eq!(request.url, "https://api.example.com/users/1");
        assert_eq!(request.method, HttpMethod::Get);
    }
}
