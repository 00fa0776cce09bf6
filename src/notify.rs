// SPDX-License-Identifier: Apache-2.0

//! Notification subsystem (spec §4.5, RFC 5277 `create-subscription`
//! semantics): named event streams with a bounded replay buffer, so a
//! subscriber asking for history back to a timestamp gets it without
//! the publisher having to keep every event forever.

use std::collections::{BTreeMap, VecDeque};

use crate::datastore::SessionId;

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub stream: String,
    pub timestamp_millis: u64,
    pub payload: String,
}

/// One named stream (spec §4.5 "Streams"), e.g. the well-known
/// `NETCONF` stream carrying datastore-change notifications, or an
/// operator-defined stream a plugin publishes to directly.
pub struct Stream {
    pub name: String,
    buffer: VecDeque<Event>,
    capacity: usize,
}

impl Stream {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self { Self { name: name.into(), buffer: VecDeque::new(), capacity } }

    fn publish(&mut self, event: Event) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    /// Replays buffered events at or after `since_millis`, in
    /// publication order (spec §4.5 "Replay").
    pub fn replay_since(&self, since_millis: u64) -> Vec<Event> {
        self.buffer.iter().filter(|e| e.timestamp_millis >= since_millis).cloned().collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

pub struct Subscription {
    pub id: SubscriptionId,
    pub session: SessionId,
    pub stream: String,
}

/// Owns every stream and the live subscriber table. A session's
/// `create-subscription` first gets a synchronous replay (if
/// requested) and then is added to `subscribers`; callers drain
/// `drain_deliveries` on their own event-loop tick to push events out
/// over the transport (spec §5 "single-threaded event loop" — this bus
/// has no background task of its own).
#[derive(Default)]
pub struct NotificationBus {
    streams: BTreeMap<String, Stream>,
    subscribers: Vec<Subscription>,
    next_subscription_id: u64,
    pending: Vec<(SessionId, Event)>,
}

impl NotificationBus {
    pub fn new() -> Self { Self::default() }

    pub fn add_stream(&mut self, name: impl Into<String>, capacity: usize) {
        let name = name.into();
        self.streams.entry(name.clone()).or_insert_with(|| Stream::new(name, capacity));
    }

    pub fn stream(&self, name: &str) -> Option<&Stream> { self.streams.get(name) }

    /// Publishes an event to a stream and queues delivery to every
    /// current subscriber of that stream.
    pub fn publish(&mut self, stream: &str, timestamp_millis: u64, payload: impl Into<String>) {
        let event = Event { stream: stream.to_string(), timestamp_millis, payload: payload.into() };
        if let Some(s) = self.streams.get_mut(stream) {
            s.publish(event.clone());
        }
        for sub in self.subscribers.iter().filter(|s| s.stream == stream) {
            self.pending.push((sub.session, event.clone()));
        }
    }

    /// Registers `session` against `stream`, immediately returning a
    /// replay of buffered events at or after `replay_since_millis` (if
    /// given) for the caller to deliver synchronously, per RFC 5277's
    /// "establish subscription" semantics: replay is part of the RPC
    /// reply path, not a later asynchronous push.
    pub fn subscribe(&mut self, session: SessionId, stream: &str, replay_since_millis: Option<u64>) -> Result<Vec<Event>, NotifyError> {
        if !self.streams.contains_key(stream) {
            return Err(NotifyError::UnknownStream(stream.to_string()));
        }
        let id = SubscriptionId(self.next_subscription_id);
        self.next_subscription_id += 1;
        self.subscribers.push(Subscription { id, session, stream: stream.to_string() });
        Ok(replay_since_millis.map(|since| self.streams[stream].replay_since(since)).unwrap_or_default())
    }

    pub fn unsubscribe_session(&mut self, session: SessionId) { self.subscribers.retain(|s| s.session != session); }

    /// Drains events queued by [`publish`](Self::publish) since the
    /// last drain, for the event loop to hand to the transport layer.
    pub fn drain_deliveries(&mut self) -> Vec<(SessionId, Event)> { std::mem::take(&mut self.pending) }
}

#[derive(Clone, Debug, PartialEq, Eq, amplify::Display, amplify::Error)]
#[display(doc_comments)]
pub enum NotifyError {
    /// stream `{0}` does not exist
    UnknownStream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribing_to_unknown_stream_fails() {
        let mut bus = NotificationBus::new();
        assert!(matches!(bus.subscribe(SessionId(1), "NETCONF", None), Err(NotifyError::UnknownStream(_))));
    }

    #[test]
    fn replay_returns_only_events_at_or_after_cutoff() {
        let mut bus = NotificationBus::new();
        bus.add_stream("NETCONF", 10);
        bus.publish("NETCONF", 100, "a");
        bus.publish("NETCONF", 200, "b");
        let replay = bus.subscribe(SessionId(1), "NETCONF", Some(150)).unwrap();
        assert_eq!(replay.len(), 1);
        assert_eq!(replay[0].payload, "b");
    }

    #[test]
    fn published_event_after_subscribe_is_queued_for_delivery() {
        let mut bus = NotificationBus::new();
        bus.add_stream("NETCONF", 10);
        bus.subscribe(SessionId(1), "NETCONF", None).unwrap();
        bus.publish("NETCONF", 300, "c");
        let deliveries = bus.drain_deliveries();
        assert_eq!(deliveries, vec![(SessionId(1), Event { stream: "NETCONF".into(), timestamp_millis: 300, payload: "c".into() })]);
        assert!(bus.drain_deliveries().is_empty());
    }

    #[test]
    fn bounded_buffer_drops_oldest_event() {
        let mut stream = Stream::new("NETCONF", 2);
        stream.publish(Event { stream: "NETCONF".into(), timestamp_millis: 1, payload: "a".into() });
        stream.publish(Event { stream: "NETCONF".into(), timestamp_millis: 2, payload: "b".into() });
        stream.publish(Event { stream: "NETCONF".into(), timestamp_millis: 3, payload: "c".into() });
        let replay = stream.replay_since(0);
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].payload, "b");
    }
}
