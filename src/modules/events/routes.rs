use axum::{
    routing::{get, put},
    Router,
};

use super::handlers::{create_event, get_event, list_events, set_event_admins, update_event};
use crate::app_state::AppState;

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event).patch(update_event))
        .route("/events/{id}/admins", put(set_event_admins))
}
