//! Registry of connected app pages.
//!
//! Each page gets an unbounded channel; the router posts [`ClientMessage`]s
//! into it. Closed channels are pruned on the next broadcast.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use super::lock;
use super::notify::NotificationData;

/// Messages the router posts to pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Activated { message: String },
    DataResynced { message: String },
    NotificationAction { action: String, data: NotificationData },
}

pub type ClientId = u64;

/// The page side of a registration.
#[derive(Debug)]
pub struct ClientConnection {
    pub id: ClientId,
    pub messages: mpsc::UnboundedReceiver<ClientMessage>,
}

#[derive(Debug)]
struct ClientEntry {
    url: Url,
    controlled: bool,
    focused: bool,
    sender: mpsc::UnboundedSender<ClientMessage>,
}

#[derive(Debug, Default)]
pub struct Clients {
    entries: Mutex<BTreeMap<ClientId, ClientEntry>>,
    next_id: AtomicU64,
}

impl Clients {
    pub fn connect(&self, url: Url, controlled: bool) -> ClientConnection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, messages) = mpsc::unbounded_channel();
        lock(&self.entries).insert(id, ClientEntry { url, controlled, focused: false, sender });
        tracing::debug!(client = id, controlled, "client connected");
        ClientConnection { id, messages }
    }

    pub fn disconnect(&self, id: ClientId) -> bool {
        lock(&self.entries).remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_controlled(&self, id: ClientId) -> bool {
        lock(&self.entries).get(&id).is_some_and(|entry| entry.controlled)
    }

    pub fn is_focused(&self, id: ClientId) -> bool {
        lock(&self.entries).get(&id).is_some_and(|entry| entry.focused)
    }

    /// Take control of every connected page. Returns how many were claimed.
    pub fn claim_all(&self) -> usize {
        let mut entries = lock(&self.entries);
        for entry in entries.values_mut() {
            entry.controlled = true;
        }
        entries.len()
    }

    /// Post a message to every controlled page. Returns the delivered count.
    pub fn broadcast(&self, message: &ClientMessage) -> usize {
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| !entry.sender.is_closed());
        entries
            .values()
            .filter(|entry| entry.controlled)
            .filter(|entry| entry.sender.send(message.clone()).is_ok())
            .count()
    }

    /// First controlled page whose URL satisfies `predicate`.
    pub fn find(&self, predicate: impl Fn(&Url) -> bool) -> Option<ClientId> {
        lock(&self.entries)
            .iter()
            .find(|(_, entry)| entry.controlled && !entry.sender.is_closed() && predicate(&entry.url))
            .map(|(id, _)| *id)
    }

    /// Focus a page and post one message to it.
    pub fn focus_and_post(&self, id: ClientId, message: ClientMessage) -> bool {
        let mut entries = lock(&self.entries);
        for (other_id, entry) in entries.iter_mut() {
            entry.focused = *other_id == id;
        }
        entries.get(&id).is_some_and(|entry| entry.sender.send(message).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(path: &str) -> Url {
        Url::parse(&format!("https://welshdog.github.io{path}")).unwrap()
    }

    #[test]
    fn test_broadcast_reaches_controlled_only() {
        let clients = Clients::default();
        let mut controlled = clients.connect(page("/ULTIMATE-HYPERFOCUS-CONSTELLATION/"), true);
        let mut uncontrolled = clients.connect(page("/ULTIMATE-HYPERFOCUS-CONSTELLATION/"), false);

        let message = ClientMessage::DataResynced { message: "refreshed".into() };
        assert_eq!(clients.broadcast(&message), 1);
        assert_eq!(controlled.messages.try_recv().unwrap(), message);
        assert!(uncontrolled.messages.try_recv().is_err());
    }

    #[test]
    fn test_claim_then_broadcast() {
        let clients = Clients::default();
        let mut a = clients.connect(page("/a"), false);
        let mut b = clients.connect(page("/b"), false);

        assert_eq!(clients.claim_all(), 2);
        let message = ClientMessage::Activated { message: "ready".into() };
        assert_eq!(clients.broadcast(&message), 2);
        assert!(a.messages.try_recv().is_ok());
        assert!(b.messages.try_recv().is_ok());
    }

    #[test]
    fn test_closed_clients_are_pruned() {
        let clients = Clients::default();
        let dropped = clients.connect(page("/a"), true);
        let _kept = clients.connect(page("/b"), true);
        drop(dropped);

        assert_eq!(clients.broadcast(&ClientMessage::Activated { message: "x".into() }), 1);
        assert_eq!(clients.len(), 1);
    }

    #[test]
    fn test_focus_and_post() {
        let clients = Clients::default();
        let mut conn = clients.connect(page("/ULTIMATE-HYPERFOCUS-CONSTELLATION/"), true);
        let id = clients.find(|url| url.path().starts_with("/ULTIMATE")).unwrap();
        assert_eq!(id, conn.id);

        let data = NotificationData { url: "/ULTIMATE-HYPERFOCUS-CONSTELLATION/".into(), action: None };
        assert!(clients.focus_and_post(id, ClientMessage::NotificationAction { action: "open".into(), data }));
        assert!(clients.is_focused(id));
        assert!(matches!(conn.messages.try_recv().unwrap(), ClientMessage::NotificationAction { .. }));
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_value(ClientMessage::DataResynced { message: "m".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "data_resynced", "message": "m"}));
    }
}
