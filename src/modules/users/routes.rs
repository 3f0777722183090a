use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{list_users, register_self, set_user_role};
use crate::app_state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", post(register_self))
        .route("/users/{uid}/role", put(set_user_role))
}
