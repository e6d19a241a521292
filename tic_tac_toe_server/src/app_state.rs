use crate::store::{message::ServerMessage, models::Space};

use std::{collections::HashMap, sync::Arc, time::SystemTime};
use tokio::sync::broadcast;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub spaces: Arc<RwLock<HashMap<String, Space>>>,
    pub tx: broadcast::Sender<(String, ServerMessage)>,
}

impl AppState {
    pub fn new(tx: broadcast::Sender<(String, ServerMessage)>) -> Self {
        AppState {
            spaces: Arc::new(RwLock::new(HashMap::new())),
            tx,
        }
    }

    pub async fn leave(&self, space_id: &str) {
        let mut spaces = self.spaces.write().await;
        if let Some(space) = spaces.get_mut(space_id) {
            space.watchers = space.watchers.saturating_sub(1);
            space.last_activity = SystemTime::now();
        }
    }
}
