//! Worker lifecycle: state, controlled clients, and page messages.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

// ==================== State ====================

/// Service worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceWorkerState {
    /// Initial state, nothing installed yet.
    #[default]
    Parsed,
    /// Installing (install event).
    Installing,
    /// Installed but waiting for activation.
    Installed,
    /// Activating (activate event).
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Retired: its host stopped. Never intercepts again.
    Redundant,
}

impl ServiceWorkerState {
    /// Only an activated worker sees fetch events.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, ServiceWorkerState::Activated)
    }
}

impl fmt::Display for ServiceWorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceWorkerState::Parsed => "parsed",
            ServiceWorkerState::Installing => "installing",
            ServiceWorkerState::Installed => "installed",
            ServiceWorkerState::Activating => "activating",
            ServiceWorkerState::Activated => "activated",
            ServiceWorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

// ==================== Messages ====================

/// Directives a page can post to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Stop waiting for old clients and activate now.
    SkipWaiting,
}

impl WorkerMessage {
    /// Parse a posted message. Anything unrecognized yields `None`.
    pub fn parse(data: &str) -> Option<Self> {
        match serde_json::from_str(data) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!(error = %e, "Ignoring unrecognized worker message");
                None
            }
        }
    }
}

// ==================== Clients ====================

/// A page the worker may control.
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Client URL.
    pub url: Url,

    /// Whether the active worker controls this client.
    pub controlled: bool,
}

/// Open clients.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

impl Clients {
    /// Create new clients manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened page. Returns its ID.
    pub fn open(&mut self, url: Url) -> String {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed));

        self.clients.insert(
            id.clone(),
            Client {
                id: id.clone(),
                url,
                controlled: false,
            },
        );
        id
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Remove a client.
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    /// Take control of every uncontrolled client. Returns the IDs claimed.
    pub fn claim(&mut self) -> Vec<String> {
        let mut claimed: Vec<String> = self
            .clients
            .values_mut()
            .filter(|c| !c.controlled)
            .map(|c| {
                c.controlled = true;
                c.id.clone()
            })
            .collect();
        claimed.sort_unstable();
        claimed
    }

    pub fn is_controlled(&self, id: &str) -> bool {
        self.clients.get(id).is_some_and(|c| c.controlled)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_and_intercept() {
        assert_eq!(ServiceWorkerState::default(), ServiceWorkerState::Parsed);
        assert_eq!(ServiceWorkerState::Installed.to_string(), "installed");
        assert!(ServiceWorkerState::Activated.can_intercept_fetch());
        assert!(!ServiceWorkerState::Installed.can_intercept_fetch());
        assert!(!ServiceWorkerState::Redundant.can_intercept_fetch());
        assert_eq!(ServiceWorkerState::Redundant.to_string(), "redundant");
    }

    #[test]
    fn test_parse_skip_waiting() {
        assert_eq!(
            WorkerMessage::parse(r#"{"type":"SKIP_WAITING"}"#),
            Some(WorkerMessage::SkipWaiting)
        );
        assert_eq!(WorkerMessage::parse(r#"{"type":"CLAIM"}"#), None);
        assert_eq!(WorkerMessage::parse("SKIP_WAITING"), None);
        assert_eq!(WorkerMessage::parse("{}"), None);
    }

    #[test]
    fn test_clients_claim() {
        let mut clients = Clients::new();
        let home = clients.open(Url::parse("https://gate7.vn/").unwrap());
        let menu = clients.open(Url::parse("https://gate7.vn/menu/").unwrap());

        assert!(!clients.is_controlled(&home));

        let claimed = clients.claim();
        assert_eq!(claimed.len(), 2);
        assert!(clients.is_controlled(&home));
        assert!(clients.is_controlled(&menu));

        // Already controlled clients are not claimed twice.
        assert!(clients.claim().is_empty());
    }

    #[test]
    fn test_clients_remove() {
        let mut clients = Clients::new();
        let id = clients.open(Url::parse("https://gate7.vn/hiring/").unwrap());
        assert!(clients.get(&id).is_some());
        assert!(clients.remove(&id).is_some());
        assert!(clients.is_empty());
        assert!(!clients.is_controlled(&id));
    }
}
