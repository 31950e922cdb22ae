//! In-process transport.
//!
//! A [`MemoryHub`] plays the relay for any number of [`MemoryTransport`]s in
//! the same process. Used for local boards and for driving several sessions
//! deterministically in tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use uuid::Uuid;

use super::{ChannelEvent, Transport, TransportError, TransportResult};
use crate::presence::{PresenceMeta, PresenceState};

#[derive(Default)]
struct Topic {
    inboxes: HashMap<String, VecDeque<ChannelEvent>>,
    presence: PresenceState,
}

impl Topic {
    fn deliver(&mut self, event: &ChannelEvent, skip: Option<&str>) {
        for (key, inbox) in self.inboxes.iter_mut() {
            if skip != Some(key.as_str()) {
                inbox.push_back(event.clone());
            }
        }
    }
}

#[derive(Default)]
struct HubState {
    topics: HashMap<String, Topic>,
}

/// Shared in-memory relay.
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, unjoined connection to this hub.
    pub fn connect(&self) -> MemoryTransport {
        MemoryTransport {
            hub: self.clone(),
            key: Uuid::new_v4().to_string(),
            topic: None,
            subscriptions: HashSet::new(),
            offline: false,
            closed: false,
        }
    }

    /// Number of connections joined to `topic`.
    pub fn member_count(&self, topic: &str) -> usize {
        self.lock()
            .topics
            .get(topic)
            .map_or(0, |t| t.inboxes.len())
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One connection to a [`MemoryHub`].
pub struct MemoryTransport {
    hub: MemoryHub,
    key: String,
    topic: Option<String>,
    subscriptions: HashSet<String>,
    offline: bool,
    closed: bool,
}

impl MemoryTransport {
    /// Presence key of this connection.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// While offline, outgoing broadcasts are silently dropped.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    fn joined_topic(&self) -> TransportResult<&str> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.topic.as_deref().ok_or(TransportError::NotConnected)
    }
}

impl Transport for MemoryTransport {
    fn join(&mut self, topic: &str) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if self.topic.is_some() {
            self.leave()?;
        }
        let mut hub = self.hub.lock();
        let t = hub.topics.entry(topic.to_string()).or_default();
        let mut inbox = VecDeque::new();
        inbox.push_back(ChannelEvent::PresenceSync);
        t.inboxes.insert(self.key.clone(), inbox);
        drop(hub);

        log::info!("Connection {} joined {topic}", self.key);
        self.topic = Some(topic.to_string());
        Ok(())
    }

    fn leave(&mut self) -> TransportResult<()> {
        let Some(topic) = self.topic.take() else {
            return Ok(());
        };
        let mut hub = self.hub.lock();
        if let Some(t) = hub.topics.get_mut(&topic) {
            t.inboxes.remove(&self.key);
            if let Some(metas) = t.presence.remove(&self.key) {
                let event = ChannelEvent::PresenceLeave {
                    key: self.key.clone(),
                    metas,
                };
                t.deliver(&event, None);
            }
            if t.inboxes.is_empty() {
                hub.topics.remove(&topic);
            }
        }
        self.subscriptions.clear();
        Ok(())
    }

    fn subscribe(&mut self, event: &str) {
        self.subscriptions.insert(event.to_string());
    }

    fn unsubscribe_all(&mut self) {
        self.subscriptions.clear();
    }

    fn send(&mut self, event: &str, payload: Value) -> TransportResult<()> {
        let topic = self.joined_topic()?.to_string();
        if self.offline {
            log::debug!("Connection {} offline, dropping {event}", self.key);
            return Ok(());
        }
        let mut hub = self.hub.lock();
        if let Some(t) = hub.topics.get_mut(&topic) {
            let event = ChannelEvent::Broadcast {
                event: event.to_string(),
                payload,
            };
            t.deliver(&event, Some(self.key.as_str()));
        }
        Ok(())
    }

    fn track(&mut self, meta: PresenceMeta) -> TransportResult<()> {
        let topic = self.joined_topic()?.to_string();
        let mut hub = self.hub.lock();
        if let Some(t) = hub.topics.get_mut(&topic) {
            t.presence.insert(self.key.clone(), vec![meta.clone()]);
            let event = ChannelEvent::PresenceJoin {
                key: self.key.clone(),
                metas: vec![meta],
            };
            t.deliver(&event, None);
        }
        Ok(())
    }

    fn untrack(&mut self) -> TransportResult<()> {
        let topic = self.joined_topic()?.to_string();
        let mut hub = self.hub.lock();
        if let Some(t) = hub.topics.get_mut(&topic) {
            if let Some(metas) = t.presence.remove(&self.key) {
                let event = ChannelEvent::PresenceLeave {
                    key: self.key.clone(),
                    metas,
                };
                t.deliver(&event, None);
            }
        }
        Ok(())
    }

    fn presence_state(&self) -> PresenceState {
        let Some(topic) = self.topic.as_deref() else {
            return PresenceState::new();
        };
        self.hub
            .lock()
            .topics
            .get(topic)
            .map(|t| t.presence.clone())
            .unwrap_or_default()
    }

    fn poll(&mut self) -> Vec<ChannelEvent> {
        let Some(topic) = self.topic.as_deref() else {
            return Vec::new();
        };
        let mut hub = self.hub.lock();
        let Some(inbox) = hub
            .topics
            .get_mut(topic)
            .and_then(|t| t.inboxes.get_mut(&self.key))
        else {
            return Vec::new();
        };
        inbox
            .drain(..)
            .filter(|e| match e {
                ChannelEvent::Broadcast { event, .. } => self.subscriptions.contains(event),
                _ => true,
            })
            .collect()
    }

    fn close(&mut self) {
        if let Err(e) = self.leave() {
            log::warn!("Failed to leave channel on close: {e}");
        }
        self.closed = true;
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn joined(hub: &MemoryHub, topic: &str) -> MemoryTransport {
        let mut t = hub.connect();
        t.join(topic).unwrap();
        t.subscribe("objects");
        t.poll();
        t
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let hub = MemoryHub::new();
        let mut a = joined(&hub, "board");
        let mut b = joined(&hub, "board");

        a.send("objects", json!({"n": 1})).unwrap();
        assert!(a.poll().is_empty());
        assert_eq!(
            b.poll(),
            vec![ChannelEvent::Broadcast {
                event: "objects".into(),
                payload: json!({"n": 1}),
            }]
        );
    }

    #[test]
    fn test_topics_are_isolated() {
        let hub = MemoryHub::new();
        let mut a = joined(&hub, "one");
        let mut b = joined(&hub, "two");
        a.send("objects", json!(1)).unwrap();
        assert!(b.poll().is_empty());
    }

    #[test]
    fn test_unsubscribed_events_are_filtered() {
        let hub = MemoryHub::new();
        let mut a = joined(&hub, "board");
        let mut b = joined(&hub, "board");
        a.send("cursor", json!({})).unwrap();
        assert!(b.poll().is_empty());
        b.subscribe("cursor");
        a.send("cursor", json!({})).unwrap();
        assert_eq!(b.poll().len(), 1);
    }

    #[test]
    fn test_presence_track_and_leave() {
        let hub = MemoryHub::new();
        let mut a = joined(&hub, "board");
        let mut b = joined(&hub, "board");

        a.track(PresenceMeta::new("u1", "Ada")).unwrap();
        assert_eq!(b.presence_state().len(), 1);
        assert!(matches!(&b.poll()[..], [ChannelEvent::PresenceJoin { metas, .. }] if metas[0].user_id == "u1"));

        a.close();
        assert!(b.presence_state().is_empty());
        assert!(matches!(&b.poll()[..], [ChannelEvent::PresenceLeave { .. }]));
        assert_eq!(hub.member_count("board"), 1);
        assert!(matches!(a.send("objects", json!(1)), Err(TransportError::Closed)));
    }

    #[test]
    fn test_offline_drops_outgoing() {
        let hub = MemoryHub::new();
        let mut a = joined(&hub, "board");
        let mut b = joined(&hub, "board");
        a.set_offline(true);
        a.send("objects", json!(1)).unwrap();
        assert!(b.poll().is_empty());
    }

    #[test]
    fn test_send_before_join_fails() {
        let hub = MemoryHub::new();
        let mut a = hub.connect();
        assert!(matches!(a.send("objects", json!(1)), Err(TransportError::NotConnected)));
    }

    #[test]
    fn test_empty_topic_is_dropped() {
        let hub = MemoryHub::new();
        let a = joined(&hub, "board");
        assert_eq!(hub.member_count("board"), 1);
        drop(a);
        assert_eq!(hub.member_count("board"), 0);
    }
}
