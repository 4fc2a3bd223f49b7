use dashmap::DashMap;
use std::sync::Arc;
use storage::{Gateway, GatewayTx, Result};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::features::live::hub::LiveHub;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn Gateway>,
    hub: LiveHub,
    session_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            hub: LiveHub::new(),
            session_locks: Arc::new(DashMap::new()),
        }
    }

    pub async fn begin(&self) -> Result<Box<dyn GatewayTx>> {
        self.gateway.begin().await
    }

    pub fn hub(&self) -> &LiveHub {
        &self.hub
    }

    /// Serializes mutations against a single session. Roster and match
    /// transitions take this before opening a transaction so capacity
    /// checks and promotions cannot interleave.
    pub fn session_lock(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        self.session_locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
