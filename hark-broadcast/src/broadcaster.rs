use arc_swap::ArcSwap;
use hark_core::{HarkError, Rendered, Token};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Identifies one connected subscriber.
pub type SubscriberId = u64;

/// JSON frame sent to browser clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePayload {
    pub text: String,
    pub tokens: Vec<Token>,
}

#[derive(Clone)]
struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<Arc<str>>,
}

/// Receiving half handed to a transport connection.
pub struct Subscription {
    pub id: SubscriberId,
    pub rx: mpsc::UnboundedReceiver<Arc<str>>,
}

/// Process-wide set of connected subscribers.
///
/// The set is copy-on-write: connect/disconnect swap in a new list, and
/// `publish` iterates whatever snapshot it loaded, so mutation never races
/// an iteration. Subscribers stay in connect order.
#[derive(Clone)]
pub struct Broadcaster {
    subscribers: Arc<ArcSwap<Vec<Subscriber>>>,
    next_id: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(ArcSwap::from_pointee(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a new subscriber (transport connect event).
    pub fn connect(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber { id, tx };
        self.subscribers.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(subscriber.clone());
            next
        });
        debug!(subscriber = id, total = self.len(), "Subscriber connected");
        Subscription { id, rx }
    }

    /// Remove a subscriber (transport disconnect event). Returns whether it
    /// was still registered.
    pub fn disconnect(&self, id: SubscriberId) -> bool {
        let previous = self.subscribers.rcu(|current| {
            current
                .iter()
                .filter(|s| s.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
        let removed = previous.iter().any(|s| s.id == id);
        if removed {
            debug!(subscriber = id, total = self.len(), "Subscriber disconnected");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.subscribers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.load().is_empty()
    }

    /// Strip styling from `text`, serialize `{text, tokens}` and queue it for
    /// every current subscriber. Never waits for delivery; a subscriber whose
    /// channel is gone is skipped, not removed. Returns how many subscribers
    /// accepted the payload.
    pub fn publish(&self, text: &str, tokens: &[Token]) -> Result<usize, HarkError> {
        let payload = WirePayload {
            text: strip_ansi_escapes::strip_str(text),
            tokens: tokens.to_vec(),
        };
        let json: Arc<str> = serde_json::to_string(&payload)?.into();

        let snapshot = self.subscribers.load();
        let mut delivered = 0;
        for subscriber in snapshot.iter() {
            match subscriber.tx.send(Arc::clone(&json)) {
                Ok(()) => delivered += 1,
                Err(_) => debug!(subscriber = subscriber.id, "Subscriber channel closed, skipping"),
            }
        }
        Ok(delivered)
    }

    pub fn publish_rendered(&self, rendered: &Rendered) -> Result<usize, HarkError> {
        self.publish(&rendered.text, &rendered.tokens)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hark_core::Kind;

    fn tokens() -> Vec<Token> {
        vec![
            Token::new(Kind::Request, "GET /", "red", "reset"),
            Token::new(Kind::Sign, " ⇒ ", "reset", "reset"),
            Token::new(Kind::Response, "ok", "green", "reset"),
        ]
    }

    #[test]
    fn publish_without_subscribers_delivers_nothing() {
        let b = Broadcaster::new();
        assert!(b.is_empty());
        assert_eq!(b.publish("GET / ⇒ ok", &tokens()).unwrap(), 0);
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let b = Broadcaster::new();
        let first = b.connect();
        let second = b.connect();
        assert!(second.id > first.id);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn disconnect_unknown_id_is_noop() {
        let b = Broadcaster::new();
        let _sub = b.connect();
        assert!(!b.disconnect(9999));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn payload_text_is_stripped_of_ansi() {
        let b = Broadcaster::new();
        let mut sub = b.connect();
        b.publish("\x1b[31mGET /\x1b[39m ⇒ ok", &tokens()).unwrap();
        let frame = sub.rx.try_recv().unwrap();
        let payload: WirePayload = serde_json::from_str(&frame).unwrap();
        assert_eq!(payload.text, "GET / ⇒ ok");
        assert_eq!(payload.tokens, tokens());
    }

    #[test]
    fn dropped_receiver_is_skipped_but_kept() {
        let b = Broadcaster::new();
        let gone = b.connect();
        let mut live = b.connect();
        drop(gone.rx);

        assert_eq!(b.publish("x", &[]).unwrap(), 1);
        assert_eq!(b.len(), 2, "only a disconnect event removes a subscriber");
        assert!(live.rx.try_recv().is_ok());
    }

    #[test]
    fn clones_share_one_subscriber_set() {
        let b = Broadcaster::new();
        let clone = b.clone();
        let _sub = clone.connect();
        assert_eq!(b.len(), 1);
    }
}
