//! Event fan-out to connected clients.
//!
//! Committed engine events are pushed to subscribed connections as
//! JSON-RPC notifications. Each subscriber has an independent buffer; a
//! subscriber that falls behind skips ahead and can page the gap from
//! `get_events`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use disburse_types::DistributorEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// An event emitted by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type name (e.g. "income_added", "daemon_started").
    pub event_type: String,
    /// Event log sequence number. Zero for daemon lifecycle events.
    pub seq: i64,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Type-specific payload.
    pub payload: serde_json::Value,
}

impl Event {
    /// Wrap a committed engine event.
    pub fn committed(seq: i64, timestamp: u64, event: &DistributorEvent) -> Self {
        Self {
            event_type: event.name().to_string(),
            seq,
            timestamp,
            payload: serde_json::to_value(event).unwrap_or(serde_json::Value::Null),
        }
    }
}

/// Filter for event subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only these event types. `None` passes everything.
    #[serde(default)]
    pub event_types: Option<Vec<String>>,
    /// Only events whose payload mentions this address.
    #[serde(default)]
    pub account: Option<String>,
}

/// Event bus for broadcasting events to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    sequence: Arc<AtomicU64>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event to all subscribers.
    pub fn emit(&self, event: Event) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events. Returns a receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Number of events emitted since startup.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl EventFilter {
    /// Check if an event matches this filter.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ref types) = self.event_types {
            if !types.iter().any(|t| t == &event.event_type) {
                return false;
            }
        }

        if let Some(ref account) = self.account {
            let account = account.to_ascii_lowercase();
            let mentioned = match event.payload.as_object() {
                Some(fields) => fields
                    .values()
                    .filter_map(|v| v.as_str())
                    .any(|v| v == account),
                None => false,
            };
            if !mentioned {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disburse_types::{Address, Category};

    fn income(seq: i64) -> Event {
        Event::committed(
            seq,
            1000,
            &DistributorEvent::IncomeAdded {
                category: Category::Standard,
                amount: 100,
            },
        )
    }

    #[test]
    fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(income(1));

        let event = rx.try_recv().expect("receive event");
        assert_eq!(event.event_type, "income_added");
        assert_eq!(event.seq, 1);
        assert_eq!(event.payload["amount"], "100");
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(income(1));
        assert_eq!(bus.sequence(), 1);
    }

    #[test]
    fn test_event_filter_types() {
        let filter = EventFilter {
            event_types: Some(vec!["paused".to_string()]),
            account: None,
        };
        assert!(!filter.matches(&income(1)));

        let paused = Event::committed(
            2,
            1000,
            &DistributorEvent::Paused {
                by: Address::from_low_u64(1),
            },
        );
        assert!(filter.matches(&paused));
    }

    #[test]
    fn test_event_filter_account() {
        let who = Address::from_low_u64(0x42);
        let withdrawn = Event::committed(
            3,
            1000,
            &DistributorEvent::BalanceWithdrawn {
                account: who,
                amount: 5,
            },
        );

        let filter = EventFilter {
            event_types: None,
            account: Some(who.to_string().to_uppercase().replace("0X", "0x")),
        };
        assert!(filter.matches(&withdrawn));
        assert!(!filter.matches(&income(1)));

        let other = EventFilter {
            event_types: None,
            account: Some(Address::from_low_u64(0x43).to_string()),
        };
        assert!(!other.matches(&withdrawn));
    }

    #[test]
    fn test_default_filter_matches_all() {
        assert!(EventFilter::default().matches(&income(1)));
    }
}
