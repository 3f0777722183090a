use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{eligible_participants, export_eligible_csv, issue_certificates};
use crate::app_state::AppState;

pub fn certificate_routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/certificates/eligible", get(eligible_participants))
        .route("/events/{id}/certificates/eligible.csv", get(export_eligible_csv))
        .route("/events/{id}/certificates/issue", post(issue_certificates))
}
