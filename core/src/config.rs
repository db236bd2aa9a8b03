//! Configuration resolution: base URL, auto-fire flag and request init.
//!
//! # Design
//! A hook instance is configured from up to three layers, lowest priority
//! first: the `FetchContext` (global defaults, the "provider"), the first
//! argument (`UrlOrOptions`), and the overrides. `resolve` answers where to
//! send requests and whether to fire on creation; `build_init` merges
//! everything that ends up on the wire.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::FetchError;
use crate::http::HttpMethod;
use crate::types::Body;

/// Environment variable read by `FetchContext::from_env`.
pub const BASE_URL_ENV: &str = "FETCH_BASE_URL";

/// Authentication rendered into an `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    Bearer(String),
    Basic { username: String, password: String },
}

/// Per-instance options. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    /// Base URL. Ignored when the options are used as overrides.
    pub url: Option<String>,
    /// Fire one request as soon as the instance is created.
    pub on_mount: Option<bool>,
    /// Verb for the auto-fired request. Defaults to GET.
    pub method: Option<HttpMethod>,
    /// Default request body, also the payload of a non-GET auto-fire.
    pub body: Option<Body>,
    pub headers: BTreeMap<String, String>,
    pub credentials: Option<Credentials>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn on_mount(mut self, on_mount: bool) -> Self {
        self.on_mount = Some(on_mount);
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Parse options from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, FetchError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Overlay `other` on top of `self`. Headers merge key by key.
    fn merge(&mut self, other: &FetchOptions) {
        if other.on_mount.is_some() {
            self.on_mount = other.on_mount;
        }
        if other.method.is_some() {
            self.method = other.method;
        }
        if other.body.is_some() {
            self.body = other.body.clone();
        }
        if other.credentials.is_some() {
            self.credentials = other.credentials.clone();
        }
        self.headers
            .extend(other.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// First argument of `use_fetch`: a bare base URL or a full options value.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlOrOptions {
    Url(String),
    Options(FetchOptions),
}

impl UrlOrOptions {
    fn url(&self) -> Option<&str> {
        match self {
            UrlOrOptions::Url(url) => Some(url),
            UrlOrOptions::Options(options) => options.url.as_deref(),
        }
    }

    fn options(&self) -> Option<&FetchOptions> {
        match self {
            UrlOrOptions::Url(_) => None,
            UrlOrOptions::Options(options) => Some(options),
        }
    }
}

impl From<&str> for UrlOrOptions {
    fn from(url: &str) -> Self {
        UrlOrOptions::Url(url.to_string())
    }
}

impl From<String> for UrlOrOptions {
    fn from(url: String) -> Self {
        UrlOrOptions::Url(url)
    }
}

impl From<FetchOptions> for UrlOrOptions {
    fn from(options: FetchOptions) -> Self {
        UrlOrOptions::Options(options)
    }
}

/// Global defaults shared by every instance created with this context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchContext {
    pub url: Option<String>,
    pub options: FetchOptions,
}

impl FetchContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            options: FetchOptions::default(),
        }
    }

    /// Context whose base URL comes from `FETCH_BASE_URL`, if set.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var(BASE_URL_ENV).ok().filter(|url| !url.is_empty()),
            options: FetchOptions::default(),
        }
    }
}

/// Where requests go and whether one fires on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub on_mount: bool,
}

/// Merged options applied to every outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInit {
    pub method: Option<HttpMethod>,
    pub body: Option<Body>,
    pub headers: BTreeMap<String, String>,
    pub credentials: Option<Credentials>,
}

fn merged_options(
    url_or_options: &UrlOrOptions,
    overrides: Option<&FetchOptions>,
    context: &FetchContext,
) -> FetchOptions {
    let mut merged = context.options.clone();
    if let Some(options) = url_or_options.options() {
        merged.merge(options);
    }
    if let Some(overrides) = overrides {
        merged.merge(overrides);
    }
    merged
}

/// Resolve the base URL and the auto-fire flag.
pub fn resolve(
    url_or_options: &UrlOrOptions,
    overrides: Option<&FetchOptions>,
    context: &FetchContext,
) -> Result<ResolvedConfig, FetchError> {
    let url = url_or_options
        .url()
        .or(context.url.as_deref())
        .ok_or(FetchError::MissingUrl)?;

    url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let on_mount = merged_options(url_or_options, overrides, context)
        .on_mount
        .unwrap_or(false);

    Ok(ResolvedConfig {
        base_url: url.trim_end_matches('/').to_string(),
        on_mount,
    })
}

/// Merge everything that ends up on the wire.
pub fn build_init(
    url_or_options: &UrlOrOptions,
    overrides: Option<&FetchOptions>,
    context: &FetchContext,
) -> RequestInit {
    let merged = merged_options(url_or_options, overrides, context);
    RequestInit {
        method: merged.method,
        body: merged.body,
        headers: merged.headers,
        credentials: merged.credentials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_url_resolves_without_auto_fire() {
        let resolved = resolve(&"https://api.example.com".into(), None, &FetchContext::default()).unwrap();
        assert_eq!(resolved.base_url, "https://api.example.com");
        assert!(!resolved.on_mount);
    }

    #[test]
    fn options_url_and_on_mount_are_used() {
        let options = FetchOptions::new().url("https://api.example.com/").on_mount(true);
        let resolved = resolve(&options.into(), None, &FetchContext::default()).unwrap();
        assert_eq!(resolved.base_url, "https://api.example.com");
        assert!(resolved.on_mount);
    }

    #[test]
    fn overrides_can_enable_auto_fire() {
        let overrides = FetchOptions::new().on_mount(true);
        let resolved = resolve(&"http://localhost:3000".into(), Some(&overrides), &FetchContext::default()).unwrap();
        assert!(resolved.on_mount);
    }

    #[test]
    fn context_supplies_missing_url() {
        let context = FetchContext::new("http://ctx.local");
        let resolved = resolve(&FetchOptions::new().into(), None, &context).unwrap();
        assert_eq!(resolved.base_url, "http://ctx.local");
    }

    #[test]
    fn explicit_url_beats_context() {
        let context = FetchContext::new("http://ctx.local");
        let resolved = resolve(&"http://explicit.local".into(), None, &context).unwrap();
        assert_eq!(resolved.base_url, "http://explicit.local");
    }

    #[test]
    fn missing_url_is_an_error() {
        let err = resolve(&FetchOptions::new().into(), None, &FetchContext::default()).unwrap_err();
        assert_eq!(err, FetchError::MissingUrl);
    }

    #[test]
    fn override_url_is_ignored() {
        let overrides = FetchOptions::new().url("http://override.local");
        let err = resolve(&FetchOptions::new().into(), Some(&overrides), &FetchContext::default()).unwrap_err();
        assert_eq!(err, FetchError::MissingUrl);
    }

    #[test]
    fn unparseable_url_is_an_error() {
        let err = resolve(&"not a url".into(), None, &FetchContext::default()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[test]
    fn init_merges_headers_and_prefers_overrides() {
        let mut context = FetchContext::new("http://ctx.local");
        context.options = FetchOptions::new().header("X-App", "demo").header("Accept", "*/*");
        let options = FetchOptions::new()
            .header("Accept", "application/json")
            .method(HttpMethod::Post)
            .body(json!({"a": 1}));
        let overrides = FetchOptions::new().body(json!({"b": 2}));

        let init = build_init(&options.into(), Some(&overrides), &context);
        assert_eq!(init.method, Some(HttpMethod::Post));
        assert_eq!(init.body, Some(Body::Json(json!({"b": 2}))));
        assert_eq!(init.headers.get("X-App").map(String::as_str), Some("demo"));
        assert_eq!(init.headers.get("Accept").map(String::as_str), Some("application/json"));
    }

    #[test]
    fn options_load_from_json() {
        let options = FetchOptions::from_json(
            r#"{
                "url": "https://api.example.com",
                "onMount": true,
                "method": "PUT",
                "body": {"name": "a"},
                "headers": {"X-Trace": "1"},
                "credentials": {"bearer": "t0k"}
            }"#,
        )
        .unwrap();
        assert_eq!(options.on_mount, Some(true));
        assert_eq!(options.method, Some(HttpMethod::Put));
        assert_eq!(options.body, Some(Body::Json(json!({"name": "a"}))));
        assert_eq!(options.credentials, Some(Credentials::Bearer("t0k".to_string())));
    }

    #[test]
    fn string_body_from_json_stays_text() {
        let options = FetchOptions::from_json(
            r#"{"url": "https://api.example.com", "method": "PATCH", "body": "a=1&b=2"}"#,
        )
        .unwrap();
        assert_eq!(options.body, Some(Body::Text("a=1&b=2".to_string())));

        let init = build_init(&options.into(), None, &FetchContext::default());
        assert_eq!(init.body, Some(Body::Text("a=1&b=2".to_string())));
    }
}
