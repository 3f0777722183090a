use axum::{routing::get, Router};

use super::handlers::{get_supported_languages, get_translations};
use crate::app_state::AppState;

pub fn i18n_routes() -> Router<AppState> {
    Router::new()
        .route("/i18n/languages", get(get_supported_languages))
        .route("/i18n/translations", get(get_translations))
}
