//! Push payload translation and notification click handling.

use serde::{Deserialize, Serialize};
use url::Url;

use constellation_core::Error;

use super::CacheRouter;
use super::clients::{ClientId, ClientMessage};
use crate::fetch::resolve;

const DEFAULT_TITLE: &str = "Hyperfocus Constellation";
const DEFAULT_BODY: &str = "New update available in your constellation!";
const DEFAULT_TAG: &str = "constellation-update";
const DEFAULT_ACTION: &str = "open";

/// Incoming push message. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
    pub require_interaction: Option<bool>,
    pub url: Option<String>,
    pub action: Option<String>,
}

/// Data carried by a notification and handed back on click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationData {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// A notification ready to be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

/// What a notification click resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// An open page was focused and told about the action.
    Focused { client: ClientId },
    /// No page is open; the host should open one at `url`.
    OpenWindow { url: String },
}

impl CacheRouter {
    /// Turn a push payload into a notification. An empty payload shows nothing.
    pub fn handle_push(&self, payload: &[u8]) -> Result<Option<Notification>, Error> {
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let push: PushPayload = serde_json::from_slice(payload)
            .map_err(|e| Error::InvalidInput(format!("malformed push payload: {e}")))?;

        let root = &self.settings().app_root;
        let icon = |name: &str| format!("{root}icons/{name}");

        Ok(Some(Notification {
            title: push.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: push.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: icon("icon-192x192.png"),
            badge: icon("badge-96x96.png"),
            tag: push.tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
            require_interaction: push.require_interaction.unwrap_or(false),
            actions: vec![
                NotificationAction {
                    action: "open".into(),
                    title: "Open Constellation".into(),
                    icon: icon("open-action.png"),
                },
                NotificationAction {
                    action: "focus".into(),
                    title: "Start Focus Session".into(),
                    icon: icon("focus-action.png"),
                },
            ],
            data: NotificationData { url: push.url.unwrap_or_else(|| root.clone()), action: push.action },
        }))
    }

    /// Route a click to an open page, or ask the host to open one.
    pub fn handle_notification_click(&self, action: Option<&str>, data: &NotificationData) -> ClickOutcome {
        let action = action.filter(|a| !a.is_empty());
        let app_root = self.settings().app_root.trim_end_matches('/').to_string();

        if let Some(client) = self.clients().find(|url| url.path().starts_with(&app_root)) {
            let message = ClientMessage::NotificationAction {
                action: action.unwrap_or(DEFAULT_ACTION).to_string(),
                data: data.clone(),
            };
            if self.clients().focus_and_post(client, message) {
                tracing::debug!(client, "focused existing client for notification");
                return ClickOutcome::Focused { client };
            }
        }

        let mut url = self.notification_target(&data.url);
        if let Some(action) = action
            && action != DEFAULT_ACTION
        {
            url.query_pairs_mut().append_pair("action", action);
        }

        tracing::debug!(url = %url, "no open client, requesting new window");
        ClickOutcome::OpenWindow { url: url.to_string() }
    }

    fn notification_target(&self, raw: &str) -> Url {
        let settings = self.settings();
        match resolve(&settings.origin, raw) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = raw, error = %e, "bad notification url, using app root");
                settings.app_url().unwrap_or_else(|_| settings.origin.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_empty_push_shows_nothing() {
        let h = harness().await;
        assert!(h.router.handle_push(b"").unwrap().is_none());
        assert!(h.router.handle_push(b"  \n").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_push_defaults() {
        let h = harness().await;
        let notification = h.router.handle_push(b"{}").unwrap().unwrap();

        assert_eq!(notification.title, "Hyperfocus Constellation");
        assert_eq!(notification.body, "New update available in your constellation!");
        assert_eq!(notification.tag, "constellation-update");
        assert_eq!(notification.icon, "/ULTIMATE-HYPERFOCUS-CONSTELLATION/icons/icon-192x192.png");
        assert_eq!(notification.badge, "/ULTIMATE-HYPERFOCUS-CONSTELLATION/icons/badge-96x96.png");
        assert!(!notification.require_interaction);
        assert_eq!(notification.data.url, "/ULTIMATE-HYPERFOCUS-CONSTELLATION/");

        let actions: Vec<_> = notification.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["open", "focus"]);
    }

    #[tokio::test]
    async fn test_push_fields_override_defaults() {
        let h = harness().await;
        let payload = br#"{"title":"New star","tag":"stars","requireInteraction":true,"action":"focus"}"#;
        let notification = h.router.handle_push(payload).unwrap().unwrap();

        assert_eq!(notification.title, "New star");
        assert_eq!(notification.tag, "stars");
        assert!(notification.require_interaction);
        assert_eq!(notification.data.action.as_deref(), Some("focus"));
    }

    #[tokio::test]
    async fn test_malformed_push_is_invalid_input() {
        let h = harness().await;
        assert!(matches!(h.router.handle_push(b"{not json"), Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_click_focuses_open_client() {
        let h = harness().await;
        let mut conn = h.connect_page("/ULTIMATE-HYPERFOCUS-CONSTELLATION/", true);
        let data = NotificationData { url: "/ULTIMATE-HYPERFOCUS-CONSTELLATION/".into(), action: None };

        let outcome = h.router.handle_notification_click(None, &data);
        assert_eq!(outcome, ClickOutcome::Focused { client: conn.id });

        match conn.messages.try_recv().unwrap() {
            ClientMessage::NotificationAction { action, data: posted } => {
                assert_eq!(action, "open");
                assert_eq!(posted, data);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_click_opens_window_with_action() {
        let h = harness().await;
        let data = NotificationData { url: "/ULTIMATE-HYPERFOCUS-CONSTELLATION/".into(), action: None };

        let focus = h.router.handle_notification_click(Some("focus"), &data);
        assert_eq!(
            focus,
            ClickOutcome::OpenWindow {
                url: "https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/?action=focus".into()
            }
        );

        let open = h.router.handle_notification_click(Some("open"), &data);
        assert_eq!(
            open,
            ClickOutcome::OpenWindow { url: "https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/".into() }
        );
    }

    #[tokio::test]
    async fn test_click_ignores_pages_outside_app() {
        let h = harness().await;
        let _elsewhere = h.connect_page("/blog/", true);
        let data = NotificationData { url: "/ULTIMATE-HYPERFOCUS-CONSTELLATION/".into(), action: None };

        assert!(matches!(h.router.handle_notification_click(None, &data), ClickOutcome::OpenWindow { .. }));
    }
}
