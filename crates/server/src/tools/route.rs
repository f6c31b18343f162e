//! route_request tool implementation.
//!
//! Sends one request through the cache router, as a page would.

use std::collections::BTreeMap;

use constellation_client::fetch::resolve;
use constellation_client::{CacheRouter, Fetcher, RequestClass};
use constellation_core::{Error, Method, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the route_request tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RouteRequestParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is intercepted.
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the route_request tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RouteRequestOutput {
    pub url: String,
    /// False when the request bypassed the router.
    pub intercepted: bool,
    /// Request class, when intercepted.
    pub class: Option<RequestClass>,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// RFC 3339 stamp of the stored copy. Set whenever the router returned its
    /// stored form, which includes static and shell responses just fetched
    /// into the static partition; live api and generic responses carry none.
    pub cached_at: Option<String>,
}

/// Implementation of the route_request tool.
pub async fn route_impl(router: &CacheRouter, params: RouteRequestParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let method: Method = params.method.parse()?;
    let url = resolve(&router.settings().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::new(method, url);
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }

    let (intercepted, response) = match router.handle_fetch(&request).await {
        Some(response) => (true, response),
        None => (false, router.fetch(&request).await?),
    };

    let output = RouteRequestOutput {
        url: request.url.to_string(),
        intercepted,
        class: intercepted.then(|| router.classify(&request.url)),
        cached_at: response.cached_at().map(|at| at.to_rfc3339()),
        body: response.text().into_owned(),
        status: response.status,
        status_text: response.status_text,
        headers: response.headers,
    };

    json_result(&output)
}
