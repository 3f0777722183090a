mod event;
mod registration;
mod user;

pub use event::*;
pub use registration::*;
pub use user::*;

#[cfg(test)]
pub(crate) use event::tests::sample_event;
