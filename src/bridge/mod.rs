//! Message channel between the foreground controller and the background
//! supervisor
//!
//! Requests carry a one-shot reply slot. The receiving side may be gone at
//! any time, so senders get an error or `None` rather than a panic.

pub mod messages;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub use messages::{Message, Rejection, Response};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no receiving context is listening")]
    Disconnected,
    #[error("receiving context dropped the request without responding")]
    NoResponse,
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A payload in flight, with an optional reply slot
#[derive(Debug)]
pub struct Envelope {
    pub payload: Value,
    reply: Option<oneshot::Sender<Response>>,
}

impl Envelope {
    /// Answer the sender. A sender that stopped waiting is not an error.
    pub fn respond(self, response: Response) {
        if let Some(reply) = self.reply {
            if reply.send(response).is_err() {
                debug!("Sender stopped waiting for a response");
            }
        }
    }
}

/// Create a connected sender/receiver pair
pub fn channel(capacity: usize) -> (BridgeSender, BridgeReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (BridgeSender { tx }, BridgeReceiver { rx })
}

/// Sending half, cheap to clone
#[derive(Debug, Clone)]
pub struct BridgeSender {
    tx: mpsc::Sender<Envelope>,
}

impl BridgeSender {
    /// Send a message and wait for its response
    pub async fn request(&self, message: &Message) -> Result<Response, BridgeError> {
        self.request_raw(serde_json::to_value(message)?).await
    }

    /// Send an arbitrary payload and wait for its response
    pub async fn request_raw(&self, payload: Value) -> Result<Response, BridgeError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Envelope {
                payload,
                reply: Some(reply),
            })
            .await
            .map_err(|_| BridgeError::Disconnected)?;
        response.await.map_err(|_| BridgeError::NoResponse)
    }

    /// Send a message, tolerating an absent receiver
    pub async fn send(&self, message: &Message) -> Option<Response> {
        match self.request(message).await {
            Ok(response) => {
                if let Some(error) = &response.error {
                    warn!("{} message rejected: {}", message.kind(), error);
                }
                Some(response)
            }
            Err(e) => {
                warn!("Could not deliver {} message: {}", message.kind(), e);
                None
            }
        }
    }

    /// Fire-and-forget: enqueue without waiting for a reply
    pub fn post(&self, message: &Message) {
        let payload = match serde_json::to_value(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to encode {} message: {}", message.kind(), e);
                return;
            }
        };

        if let Err(e) = self.tx.try_send(Envelope { payload, reply: None }) {
            warn!("Could not post {} message: {}", message.kind(), e);
        }
    }
}

/// Receiving half, owned by the background supervisor
#[derive(Debug)]
pub struct BridgeReceiver {
    rx: mpsc::Receiver<Envelope>,
}

impl BridgeReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}
