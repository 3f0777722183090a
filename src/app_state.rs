use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::db::{Event, EventRepository};
use crate::i18n::Localizer;
use crate::websocket::EventChange;

/// Buffered change notifications per subscriber before it starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn EventRepository>,
    pub env: Config,
    pub events_tx: broadcast::Sender<EventChange>,
    pub localizer: Arc<Localizer>,
    pub tokens: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(repo: Arc<dyn EventRepository>, env: Config, localizer: Arc<Localizer>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let tokens = Arc::new(TokenVerifier::from_config(&env.auth));
        Self {
            repo,
            env,
            events_tx,
            localizer,
            tokens,
        }
    }

    /// Publish the event's current counter and status to live subscribers.
    pub fn notify_change(&self, event: &Event) {
        let change = EventChange::from_event(event, OffsetDateTime::now_utc());
        // No receivers is the normal idle state.
        if self.events_tx.send(change).is_err() {
            tracing::trace!(event_id = %event.id, "No live subscribers for event change");
        }
    }
}
