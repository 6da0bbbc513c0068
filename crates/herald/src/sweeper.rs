//! Background sweeper.
//!
//! Verification already reaps the entries it touches. The sweeper bounds
//! memory for challenges nobody ever verifies and for callers that stopped
//! calling.

use std::time::Duration;
use tokio::sync::broadcast;

use crate::state::AppState;

/// Run the periodic sweep until shutdown is signalled
pub async fn sweep_worker(state: AppState, every: Duration, mut shutdown: broadcast::Receiver<()>) {
    tracing::info!("🧹 Sweeper started (every {:?})", every);

    let mut ticker = tokio::time::interval(every);
    // The first tick fires immediately; nothing can be expired yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(&state);
            }
            _ = shutdown.recv() => {
                tracing::info!("🧹 Sweeper shutting down...");
                break;
            }
        }
    }
}

fn sweep_once(state: &AppState) {
    let challenges = state.store.sweep_expired();
    let callers = state.rate_limiter.sweep();

    if challenges > 0 || callers > 0 {
        tracing::debug!(
            expired_challenges = challenges,
            idle_callers = callers,
            remaining = state.store.len(),
            "Sweep complete"
        );
    }
}
