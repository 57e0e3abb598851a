//! Bounded, drop-oldest outbound queue (spec §4.4, §8 scenario 4). A plain
//! `tokio::mpsc` channel drops the *newest* item on a full bounded send,
//! which is the wrong end; this is a small ring buffer behind a mutex with a
//! `Notify` to wake the forwarder task, matching "on overflow the oldest
//! message is dropped ... the client is not disconnected".

use super::HubMessage;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

pub struct OutboundQueue {
    capacity: usize,
    inner: Mutex<VecDeque<HubMessage>>,
    notify: Notify,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
        }
    }

    /// Returns `true` if pushing this message dropped the oldest one.
    pub fn push(&self, message: HubMessage) -> bool {
        let dropped = {
            let mut guard = self.inner.lock().unwrap();
            let dropped = if guard.len() >= self.capacity {
                guard.pop_front();
                true
            } else {
                false
            };
            guard.push_back(message);
            dropped
        };
        self.notify.notify_one();
        dropped
    }

    pub async fn recv(&self) -> HubMessage {
        loop {
            if let Some(message) = self.inner.lock().unwrap().pop_front() {
                return message;
            }
            self.notify.notified().await;
        }
    }

    pub fn try_recv(&self) -> Option<HubMessage> {
        self.inner.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
