use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{
    delete_registration, list_registrations, my_registrations, record_attendance, register,
    toggle_final_activity,
};
use crate::app_state::AppState;

pub fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/registrations", get(list_registrations).post(register))
        .route("/events/{id}/registrations/{cpf}", delete(delete_registration))
        .route("/events/{id}/registrations/{cpf}/attendances", post(record_attendance))
        .route("/events/{id}/registrations/{cpf}/final-activity", post(toggle_final_activity))
        .route("/registrations", get(my_registrations))
}
