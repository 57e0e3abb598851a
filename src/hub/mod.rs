//! Real-time hub (spec §4.4): a single-consumer actor owning the client
//! registry, channel subscriptions and per-user client map. Grounded on the
//! teacher's actor-over-channel idiom (`state.rs`'s channel-based shared
//! state, `server/ws.rs`'s split-sink-stream upgrade) but replacing the
//! teacher's bare `tokio::sync::broadcast` with bounded, drop-oldest
//! per-client queues and an explicit command queue, per spec §9's "one task
//! owns the state" decision.

mod queue;

pub use queue::OutboundQueue;

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A message fanned out to clients; always JSON-serializable (spec §6 wire
/// payloads).
#[derive(Debug, Clone, Serialize)]
pub struct HubMessage {
    pub channel: String,
    pub payload: serde_json::Value,
}

struct ClientHandle {
    user_id: crate::domain::UserId,
    queue: Arc<OutboundQueue>,
}

enum Command {
    Register {
        user_id: crate::domain::UserId,
        reply: oneshot::Sender<(ClientId, Arc<OutboundQueue>)>,
    },
    Unregister {
        client_id: ClientId,
    },
    Subscribe {
        client_id: ClientId,
        channel: String,
    },
    Unsubscribe {
        client_id: ClientId,
        channel: String,
    },
    Broadcast {
        channel: String,
        payload: serde_json::Value,
    },
    SendToUser {
        user_id: crate::domain::UserId,
        payload: serde_json::Value,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
    ConnectionCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle cloned into every caller; all methods just enqueue a `Command` onto
/// the single service task (spec §4.4: "all maps are mutated only inside that
/// service loop").
#[derive(Clone)]
pub struct RealtimeHub {
    tx: mpsc::Sender<Command>,
}

impl RealtimeHub {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(run(rx));
        Self { tx }
    }

    /// Registers a client and returns its id plus the queue a caller-owned
    /// forwarder task should drain and write to the actual transport. The
    /// hub never calls a "send function" itself; it only ever enqueues
    /// (spec §4.4: "a client whose send function returns an error is
    /// unregistered on the next attempt" -- that attempt is the forwarder's,
    /// which should call `unregister` once its write fails).
    pub async fn register(&self, user_id: crate::domain::UserId) -> (ClientId, Arc<OutboundQueue>) {
        let (reply, recv) = oneshot::channel();
        let _ = self.tx.send(Command::Register { user_id, reply }).await;
        recv.await.unwrap_or_else(|_| {
            (ClientId::new(), Arc::new(OutboundQueue::new(OUTBOUND_QUEUE_CAPACITY)))
        })
    }

    pub async fn unregister(&self, client_id: ClientId) {
        let _ = self.tx.send(Command::Unregister { client_id }).await;
    }

    pub async fn subscribe(&self, client_id: ClientId, channel: &str) {
        let _ = self
            .tx
            .send(Command::Subscribe {
                client_id,
                channel: channel.to_string(),
            })
            .await;
    }

    pub async fn unsubscribe(&self, client_id: ClientId, channel: &str) {
        let _ = self
            .tx
            .send(Command::Unsubscribe {
                client_id,
                channel: channel.to_string(),
            })
            .await;
    }

    pub async fn broadcast(&self, channel: &str, payload: serde_json::Value) {
        let _ = self
            .tx
            .send(Command::Broadcast {
                channel: channel.to_string(),
                payload,
            })
            .await;
    }

    pub async fn send_to_user(&self, user_id: crate::domain::UserId, payload: serde_json::Value) {
        let _ = self.tx.send(Command::SendToUser { user_id, payload }).await;
    }

    /// Drains every client's outbound queue once and stops the service task
    /// (spec §4.8: "close the hub, draining outbound queues once").
    pub async fn drain(&self) {
        let (reply, recv) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = recv.await;
        }
    }

    /// Number of currently registered clients, for the `/metrics` surface.
    pub async fn connection_count(&self) -> usize {
        let (reply, recv) = oneshot::channel();
        if self.tx.send(Command::ConnectionCount { reply }).await.is_err() {
            return 0;
        }
        recv.await.unwrap_or(0)
    }
}

async fn run(mut rx: mpsc::Receiver<Command>) {
    let mut clients: HashMap<ClientId, ClientHandle> = HashMap::new();
    let mut subscriptions: HashMap<String, HashSet<ClientId>> = HashMap::new();
    let mut by_user: HashMap<crate::domain::UserId, HashSet<ClientId>> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Register { user_id, reply } => {
                let client_id = ClientId::new();
                let queue = Arc::new(OutboundQueue::new(OUTBOUND_QUEUE_CAPACITY));
                clients.insert(
                    client_id,
                    ClientHandle {
                        user_id,
                        queue: queue.clone(),
                    },
                );
                by_user.entry(user_id).or_default().insert(client_id);
                let _ = reply.send((client_id, queue));
            }
            Command::Unregister { client_id } => {
                remove_client(&mut clients, &mut subscriptions, &mut by_user, client_id);
            }
            Command::Subscribe { client_id, channel } => {
                if clients.contains_key(&client_id) {
                    subscriptions.entry(channel).or_default().insert(client_id);
                }
            }
            Command::Unsubscribe { client_id, channel } => {
                if let Some(set) = subscriptions.get_mut(&channel) {
                    set.remove(&client_id);
                }
            }
            Command::Broadcast { channel, payload } => {
                let Some(subscribers) = subscriptions.get(&channel) else {
                    continue;
                };
                let message = HubMessage {
                    channel: channel.clone(),
                    payload,
                };
                for client_id in subscribers {
                    if let Some(handle) = clients.get(client_id) {
                        if handle.queue.push(message.clone()) {
                            tracing::warn!(client = ?client_id, %channel, "outbound queue full, dropped oldest message");
                        }
                    }
                }
            }
            Command::SendToUser { user_id, payload } => {
                let Some(client_ids) = by_user.get(&user_id).cloned() else {
                    continue;
                };
                let message = HubMessage {
                    channel: "user".to_string(),
                    payload,
                };
                for client_id in client_ids {
                    if let Some(handle) = clients.get(&client_id) {
                        if handle.queue.push(message.clone()) {
                            tracing::warn!(client = ?client_id, %user_id, "outbound queue full, dropped oldest message");
                        }
                    }
                }
            }
            Command::Shutdown { reply } => {
                for handle in clients.values() {
                    while handle.queue.try_recv().is_some() {}
                }
                let _ = reply.send(());
                break;
            }
            Command::ConnectionCount { reply } => {
                let _ = reply.send(clients.len());
            }
        }
    }
    tracing::info!("hub service task stopped");
}

fn remove_client(
    clients: &mut HashMap<ClientId, ClientHandle>,
    subscriptions: &mut HashMap<String, HashSet<ClientId>>,
    by_user: &mut HashMap<crate::domain::UserId, HashSet<ClientId>>,
    client_id: ClientId,
) {
    if let Some(handle) = clients.remove(&client_id) {
        by_user.entry(handle.user_id).and_modify(|set| {
            set.remove(&client_id);
        });
    }
    for set in subscriptions.values_mut() {
        set.remove(&client_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use serde_json::json;

    #[tokio::test]
    async fn subscriber_receives_broadcasts_in_call_order() {
        let hub = RealtimeHub::spawn();
        let (client_id, queue) = hub.register(UserId::new()).await;
        hub.subscribe(client_id, "odds").await;

        hub.broadcast("odds", json!({"seq": 1})).await;
        hub.broadcast("odds", json!({"seq": 2})).await;

        let first = queue.recv().await;
        let second = queue.recv().await;
        assert_eq!(first.payload, json!({"seq": 1}));
        assert_eq!(second.payload, json!({"seq": 2}));
    }

    #[tokio::test]
    async fn send_to_user_reaches_only_that_users_clients() {
        let hub = RealtimeHub::spawn();
        let user_a = UserId::new();
        let user_b = UserId::new();
        let (_, queue_a) = hub.register(user_a).await;
        let (_, queue_b) = hub.register(user_b).await;

        hub.send_to_user(user_a, json!({"alert": "triggered"})).await;
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let got = queue_a.recv().await;
        assert_eq!(got.payload, json!({"alert": "triggered"}));
        assert!(queue_b.try_recv().is_none());
    }

    #[tokio::test]
    async fn full_queue_drops_oldest_client_stays_registered() {
        let hub = RealtimeHub::spawn();
        let (client_id, queue) = hub.register(UserId::new()).await;
        hub.subscribe(client_id, "stocks").await;

        for i in 1..=257 {
            hub.broadcast("stocks", json!({"frame": i})).await;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // frame 1 was dropped; the oldest surviving frame is #2.
        let first = queue.recv().await;
        assert_eq!(first.payload, json!({"frame": 2}));
        assert_eq!(queue.len(), 255);
    }
}
