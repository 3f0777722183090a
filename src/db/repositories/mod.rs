mod memory;
mod postgres;

pub use memory::MemoryEventRepository;
pub use postgres::PgEventRepository;

use async_trait::async_trait;
use time::Duration;
use uuid::Uuid;

use crate::db::error::DbResult;
use crate::db::models::{AttendanceRecord, Event, Registration, User, UserRole};
use crate::domain::Cpf;

/// Storage for events, their registrations and application users.
///
/// Counter maintenance is the repository's job: `register` and
/// `delete_registration` adjust `registrations_count` in the same unit of
/// work as the registration itself, and `save_event` never writes it.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn ping(&self) -> DbResult<()>;

    async fn list_events(&self) -> DbResult<Vec<Event>>;

    async fn get_event(&self, id: Uuid) -> DbResult<Option<Event>>;

    async fn create_event(&self, event: Event) -> DbResult<Event>;

    /// Persist every field of `event` except the registration counter.
    async fn save_event(&self, event: &Event) -> DbResult<Event>;

    /// Insert a registration and bump the event counter.
    ///
    /// Fails with `CapacityReached` when the event is full and `Duplicate`
    /// when the CPF is already registered. Returns the updated event.
    async fn register(&self, registration: Registration) -> DbResult<Event>;

    async fn get_registration(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<Option<Registration>>;

    async fn list_registrations(&self, event_id: Uuid) -> DbResult<Vec<Registration>>;

    async fn registrations_by_cpf(&self, cpf: &Cpf) -> DbResult<Vec<Registration>>;

    /// Remove a registration and decrement the event counter.
    async fn delete_registration(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<Event>;

    /// Append an attendance record. With `min_interval`, fails with
    /// `TooSoon` when the latest record is more recent than that; the check
    /// and the insert are one atomic step.
    async fn append_attendance(
        &self,
        event_id: Uuid,
        cpf: &Cpf,
        record: AttendanceRecord,
        min_interval: Option<Duration>,
    ) -> DbResult<Registration>;

    /// Flip the final-activity flag and return its new value.
    async fn toggle_final_activity(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<bool>;

    /// Set `certificate_issued` for the given CPFs; returns how many changed.
    async fn mark_certificates_issued(&self, event_id: Uuid, cpfs: &[Cpf]) -> DbResult<u64>;

    async fn get_user(&self, uid: &str) -> DbResult<Option<User>>;

    async fn create_user(&self, user: User) -> DbResult<User>;

    async fn list_users(&self) -> DbResult<Vec<User>>;

    async fn set_user_role(&self, uid: &str, role: UserRole) -> DbResult<User>;
}
