pub mod certificates;
pub mod events;
pub mod i18n;
pub mod registrations;
pub mod users;

use axum::Router;

use crate::app_state::AppState;

/// Everything mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(events::routes::event_routes())
        .merge(registrations::routes::registration_routes())
        .merge(certificates::routes::certificate_routes())
        .merge(users::routes::user_routes())
        .merge(i18n::routes::i18n_routes())
}
