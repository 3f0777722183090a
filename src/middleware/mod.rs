pub mod auth;
pub mod language;
pub mod tracing;

pub use auth::{AdminUser, CurrentUser};
pub use language::language_middleware;
pub use tracing::observability_middleware;
