use dashmap::DashMap;
use std::sync::Arc;
use storage::dto::live::LiveSessionState;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

/// Per-session broadcast fan-out. Each watched session owns one channel;
/// slow subscribers drop lagged snapshots rather than block publishers.
#[derive(Clone)]
pub struct LiveHub {
    channels: Arc<DashMap<Uuid, broadcast::Sender<Arc<LiveSessionState>>>>,
}

impl LiveHub {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Subscribing is idempotent: the first subscriber creates the channel,
    /// later ones join it.
    pub fn subscribe(&self, session_id: Uuid) -> broadcast::Receiver<Arc<LiveSessionState>> {
        self.channels
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publishes a snapshot to every subscriber of the session. A session
    /// nobody watches has no channel and the snapshot is dropped.
    pub fn publish(&self, session_id: Uuid, state: LiveSessionState) {
        if let Some(sender) = self.channels.get(&session_id) {
            let _ = sender.send(Arc::new(state));
        }
    }

    /// Drops the channel once the last subscriber disconnects.
    pub fn release(&self, session_id: Uuid) {
        self.channels
            .remove_if(&session_id, |_, sender| sender.receiver_count() == 0);
    }
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> LiveSessionState {
        LiveSessionState {
            group_name: "Friday night".to_string(),
            courts: vec![],
            staged_matches: vec![],
            waiting_pool: vec![],
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let hub = LiveHub::new();
        hub.publish(Uuid::new_v4(), empty_state());
    }

    #[tokio::test]
    async fn subscribers_receive_published_snapshots() {
        let hub = LiveHub::new();
        let session_id = Uuid::new_v4();

        let mut rx_a = hub.subscribe(session_id);
        let mut rx_b = hub.subscribe(session_id);

        hub.publish(session_id, empty_state());

        assert_eq!(rx_a.recv().await.unwrap().group_name, "Friday night");
        assert_eq!(rx_b.recv().await.unwrap().group_name, "Friday night");
    }

    #[tokio::test]
    async fn release_keeps_channel_while_subscribed() {
        let hub = LiveHub::new();
        let session_id = Uuid::new_v4();

        let rx = hub.subscribe(session_id);
        hub.release(session_id);
        assert!(hub.channels.contains_key(&session_id));

        drop(rx);
        hub.release(session_id);
        assert!(!hub.channels.contains_key(&session_id));
    }
}
