//! HTTP-shaped request and response values passed between the router,
//! its fetchers, and the partition store.
//!
//! Responses are plain data: every offline or failure path still produces a
//! well-formed `Response`, so callers inspect the status instead of handling
//! errors.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Synthetic header recording when an entry was written, in epoch milliseconds.
pub const CACHED_AT_HEADER: &str = "sw-cached-at";

/// Synthetic header recording when an entry stops being servable, in epoch milliseconds.
pub const EXPIRES_HEADER: &str = "sw-cache-expires";

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    /// Only `GET` requests are intercepted and cached.
    pub fn is_cacheable(self) -> bool {
        matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(crate::Error::InvalidInput(format!("unsupported method: {other}"))),
        }
    }
}

/// An outbound request seen by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: BTreeMap::new() }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// Add a header. Names are stored lowercased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// A response, either live from the network, served from a partition, or synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    /// Header map keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self { status, status_text: status_text.into(), headers: BTreeMap::new(), body: body.into() }
    }

    /// Add a header. Names are stored lowercased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Copy of this response carrying the synthetic cache headers.
    pub fn stamped(mut self, cached_at: DateTime<Utc>, expires_at: Option<DateTime<Utc>>) -> Self {
        self.headers.insert(CACHED_AT_HEADER.into(), cached_at.timestamp_millis().to_string());
        match expires_at {
            Some(expires) => {
                self.headers.insert(EXPIRES_HEADER.into(), expires.timestamp_millis().to_string());
            }
            None => {
                self.headers.remove(EXPIRES_HEADER);
            }
        }
        self
    }

    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.header(CACHED_AT_HEADER).and_then(parse_millis)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.header(EXPIRES_HEADER).and_then(parse_millis)
    }

    /// True when the entry carries an expiry that has not yet elapsed at `now`.
    ///
    /// Entries without a parseable expiry are never fresh.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expires| now < expires)
    }
}

fn parse_millis(value: &str) -> Option<DateTime<Utc>> {
    let millis = value.trim().parse::<i64>().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}
