//! In-process topic message bus
//!
//! Stands in for the managed publish/subscribe service: producers publish a
//! JSON body to a named topic, consumers subscribe to one topic and receive
//! every message published after they subscribed. Each subscription is a
//! bounded `tokio::sync::mpsc` queue, so nothing published is ever dropped; a
//! full queue makes `publish` wait until the subscriber catches up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Error, Result};

/// One published message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusMessage {
    pub message_id: Uuid,
    pub topic: String,
    /// Structured JSON body
    pub data: serde_json::Value,
    pub publish_time: DateTime<Utc>,
}

impl BusMessage {
    /// Decode the body into a typed message
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

type Subscribers = HashMap<String, Vec<mpsc::Sender<BusMessage>>>;

/// Cloneable handle to the bus
#[derive(Debug, Clone)]
pub struct MessageBus {
    subscribers: Arc<Mutex<Subscribers>>,
    capacity: usize,
}

impl MessageBus {
    /// Create a bus queueing up to `capacity` messages per subscriber
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Publish `body` as JSON to every subscriber of `topic`
    ///
    /// Waits while a subscriber's queue is full. Fails when nothing is
    /// subscribed: the message would be lost.
    pub async fn publish<T: Serialize>(&self, topic: &str, body: &T) -> Result<BusMessage> {
        let message = BusMessage {
            message_id: Uuid::new_v4(),
            topic: topic.to_string(),
            data: serde_json::to_value(body)?,
            publish_time: Utc::now(),
        };

        let senders = self.live_senders(topic)?;
        let mut delivered = 0usize;
        for sender in senders {
            if sender.send(message.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        if delivered == 0 {
            return Err(Error::Internal(format!("no subscribers on topic {topic}")));
        }
        Ok(message)
    }

    /// Receive future messages for one topic
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        // A poisoned map still holds valid senders
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.entry(topic.to_string()).or_default().push(tx);
        Subscription {
            topic: topic.to_string(),
            rx,
        }
    }

    /// Senders of `topic` whose subscription is still alive; closed ones are pruned
    fn live_senders(&self, topic: &str) -> Result<Vec<mpsc::Sender<BusMessage>>> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| Error::Internal("subscriber map lock poisoned".to_string()))?;
        let Some(senders) = subscribers.get_mut(topic) else {
            return Ok(Vec::new());
        };
        senders.retain(|s| !s.is_closed());
        Ok(senders.clone())
    }
}

/// Queue of messages for a single topic
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    rx: mpsc::Receiver<BusMessage>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Next message on this topic; `None` once every bus handle is gone
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }
}
