mod routes;
mod ws_handler;

pub use routes::websocket_routes;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{Event, EventStatus};

/// Live update for an event's registration counter, pushed to `/ws` clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventChange {
    pub event_id: Uuid,
    pub registrations_count: i32,
    pub max_participants: i32,
    pub status: EventStatus,
}

impl EventChange {
    pub fn from_event(event: &Event, now: OffsetDateTime) -> Self {
        Self {
            event_id: event.id,
            registrations_count: event.registrations_count,
            max_participants: event.max_participants,
            status: event.effective_status(now),
        }
    }
}
