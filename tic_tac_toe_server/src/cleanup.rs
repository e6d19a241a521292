use crate::app_state::AppState;

use std::{sync::Arc, time::Duration};
use tracing::info;

/// Drops spaces nobody has joined or written to within `ttl`.
pub async fn cleanup_inactive_spaces(app_state: Arc<AppState>, ttl: Duration, every: Duration) {
    loop {
        tokio::time::sleep(every).await;
        remove_idle_spaces(&app_state, ttl).await;
    }
}

pub async fn remove_idle_spaces(app_state: &AppState, ttl: Duration) -> usize {
    let mut spaces = app_state.spaces.write().await;
    let before_cleanup = spaces.len();

    spaces.retain(|_, space| !space.is_idle(ttl));

    let removed = before_cleanup - spaces.len();
    if removed > 0 {
        info!("Cleaned up inactive spaces. Remaining: {}", spaces.len());
    }
    removed
}
