//! Synthetic responses for requests that cannot be answered.

use constellation_core::Response;

pub(super) const ASSET_UNAVAILABLE: &str = "Asset unavailable offline";
pub(super) const CDN_UNAVAILABLE: &str = "CDN asset unavailable offline";
pub(super) const RESOURCE_UNAVAILABLE: &str = "Resource unavailable offline";

const API_OFFLINE_MESSAGE: &str = "GitHub API unavailable offline. Cached data may be shown.";

/// Plain-text 404 for an offline cache miss.
pub(super) fn not_found(message: &str) -> Response {
    Response::new(404, "Not Found", message).with_header("content-type", "text/plain; charset=utf-8")
}

/// JSON 503 served when the API is unreachable and nothing fresh is stored.
pub(super) fn api_offline() -> Response {
    let body = serde_json::json!({
        "error": "Offline",
        "message": API_OFFLINE_MESSAGE,
        "offline": true,
    });
    Response::new(503, "Service Unavailable", body.to_string()).with_header("content-type", "application/json")
}

/// Minimal offline document with a retry button, served in place of the app shell.
pub(super) fn offline_page() -> Response {
    Response::new(200, "OK", OFFLINE_PAGE).with_header("content-type", "text/html; charset=utf-8")
}

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Offline - Hyperfocus Constellation</title>
<style>
body { font-family: system-ui, sans-serif; background: #0a0a0f; color: #fff; display: flex;
       align-items: center; justify-content: center; min-height: 100vh; margin: 0; text-align: center; }
.offline { max-width: 400px; padding: 2rem; }
h1 { color: #00d9ff; }
p { line-height: 1.6; }
button { background: #00d9ff; color: #0a0a0f; border: none; padding: 12px 24px; border-radius: 8px;
         font-weight: 600; cursor: pointer; margin-top: 1rem; }
</style>
</head>
<body>
<main class="offline">
<h1>You're Offline</h1>
<p>The constellation is currently unavailable. Check your internet connection and try again.</p>
<p>Some cached content may still be available.</p>
<button onclick="window.location.reload()">Retry</button>
</main>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_offline_body() {
        let response = api_offline();
        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.content_type(), Some("application/json"));

        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "Offline");
        assert_eq!(body["offline"], true);
        assert!(body["message"].as_str().unwrap().contains("unavailable offline"));
    }

    #[test]
    fn test_offline_page_has_retry() {
        let response = offline_page();
        assert_eq!(response.status, 200);
        assert!(response.content_type().unwrap().starts_with("text/html"));
        assert!(response.text().contains("window.location.reload()"));
    }
}
