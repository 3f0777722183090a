pub mod app;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod i18n;
pub mod middleware;
pub mod modules;
pub mod telemetry;
pub mod websocket;

pub use app::create_router;
pub use app_state::AppState;
