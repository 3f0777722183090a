use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::EventRepository;
use crate::db::error::{DatabaseError, DbResult};
use crate::db::models::{AttendanceRecord, Event, Registration, User, UserRole};
use crate::domain::Cpf;

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    registrations: HashMap<Uuid, BTreeMap<Cpf, Registration>>,
    users: BTreeMap<String, User>,
}

/// Process-local repository used when no database is configured and in tests.
/// A single write lock makes every operation atomic.
#[derive(Default)]
pub struct MemoryEventRepository {
    inner: RwLock<Inner>,
}

impl MemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        (a.start_date.is_none(), a.start_date, &a.name).cmp(&(b.start_date.is_none(), b.start_date, &b.name))
    });
}

fn sort_registrations(registrations: &mut [Registration]) {
    registrations.sort_by(|a, b| (&a.name, &a.cpf).cmp(&(&b.name, &b.cpf)));
}

#[async_trait]
impl EventRepository for MemoryEventRepository {
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }

    async fn list_events(&self) -> DbResult<Vec<Event>> {
        let inner = self.inner.read().await;
        let mut events: Vec<Event> = inner.events.values().cloned().collect();
        sort_events(&mut events);
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> DbResult<Option<Event>> {
        Ok(self.inner.read().await.events.get(&id).cloned())
    }

    async fn create_event(&self, event: Event) -> DbResult<Event> {
        let mut inner = self.inner.write().await;
        if inner.events.contains_key(&event.id) {
            return Err(DatabaseError::Duplicate);
        }
        inner.registrations.insert(event.id, BTreeMap::new());
        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn save_event(&self, event: &Event) -> DbResult<Event> {
        let mut inner = self.inner.write().await;
        let stored = inner.events.get_mut(&event.id).ok_or(DatabaseError::NotFound)?;

        let registrations_count = stored.registrations_count;
        *stored = Event {
            registrations_count,
            updated_at: OffsetDateTime::now_utc(),
            ..event.clone()
        };
        Ok(stored.clone())
    }

    async fn register(&self, registration: Registration) -> DbResult<Event> {
        let mut inner = self.inner.write().await;
        let Inner { events, registrations, .. } = &mut *inner;

        let event = events.get_mut(&registration.event_id).ok_or(DatabaseError::NotFound)?;
        if event.is_full() {
            return Err(DatabaseError::CapacityReached);
        }

        let entries = registrations.entry(event.id).or_default();
        if entries.contains_key(&registration.cpf) {
            return Err(DatabaseError::Duplicate);
        }

        entries.insert(registration.cpf.clone(), registration);
        event.registrations_count += 1;
        Ok(event.clone())
    }

    async fn get_registration(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<Option<Registration>> {
        let inner = self.inner.read().await;
        Ok(inner
            .registrations
            .get(&event_id)
            .and_then(|entries| entries.get(cpf))
            .cloned())
    }

    async fn list_registrations(&self, event_id: Uuid) -> DbResult<Vec<Registration>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Registration> = inner
            .registrations
            .get(&event_id)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        sort_registrations(&mut list);
        Ok(list)
    }

    async fn registrations_by_cpf(&self, cpf: &Cpf) -> DbResult<Vec<Registration>> {
        let inner = self.inner.read().await;
        let mut list: Vec<Registration> = inner
            .registrations
            .values()
            .filter_map(|entries| entries.get(cpf).cloned())
            .collect();
        list.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(list)
    }

    async fn delete_registration(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<Event> {
        let mut inner = self.inner.write().await;
        let Inner { events, registrations, .. } = &mut *inner;

        let event = events.get_mut(&event_id).ok_or(DatabaseError::NotFound)?;
        registrations
            .get_mut(&event_id)
            .and_then(|entries| entries.remove(cpf))
            .ok_or(DatabaseError::NotFound)?;

        event.registrations_count = (event.registrations_count - 1).max(0);
        Ok(event.clone())
    }

    async fn append_attendance(
        &self,
        event_id: Uuid,
        cpf: &Cpf,
        record: AttendanceRecord,
        min_interval: Option<Duration>,
    ) -> DbResult<Registration> {
        let mut inner = self.inner.write().await;
        let registration = inner
            .registrations
            .get_mut(&event_id)
            .and_then(|entries| entries.get_mut(cpf))
            .ok_or(DatabaseError::NotFound)?;

        if let (Some(interval), Some(last)) = (min_interval, registration.last_attendance()) {
            if record.timestamp - last.timestamp < interval {
                return Err(DatabaseError::TooSoon);
            }
        }

        registration.attendances.push(record);
        Ok(registration.clone())
    }

    async fn toggle_final_activity(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<bool> {
        let mut inner = self.inner.write().await;
        let registration = inner
            .registrations
            .get_mut(&event_id)
            .and_then(|entries| entries.get_mut(cpf))
            .ok_or(DatabaseError::NotFound)?;

        registration.final_activity_submitted = !registration.final_activity_submitted;
        Ok(registration.final_activity_submitted)
    }

    async fn mark_certificates_issued(&self, event_id: Uuid, cpfs: &[Cpf]) -> DbResult<u64> {
        let mut inner = self.inner.write().await;
        let entries = inner.registrations.get_mut(&event_id).ok_or(DatabaseError::NotFound)?;

        let mut changed = 0;
        for cpf in cpfs {
            if let Some(registration) = entries.get_mut(cpf) {
                if !registration.certificate_issued {
                    registration.certificate_issued = true;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn get_user(&self, uid: &str) -> DbResult<Option<User>> {
        Ok(self.inner.read().await.users.get(uid).cloned())
    }

    async fn create_user(&self, user: User) -> DbResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.uid) {
            return Err(DatabaseError::Duplicate);
        }
        inner.users.insert(user.uid.clone(), user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn set_user_role(&self, uid: &str, role: UserRole) -> DbResult<User> {
        let mut inner = self.inner.write().await;
        let user = inner.users.get_mut(uid).ok_or(DatabaseError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{sample_event, NewRegistration};
    use time::macros::datetime;

    fn registration_for(event: &Event, cpf: &str, name: &str) -> Registration {
        let payload = NewRegistration {
            cpf: cpf.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: String::new(),
            institution: String::new(),
        };
        Registration::new(
            event.id,
            Cpf::parse(cpf).unwrap(),
            payload,
            datetime!(2025-05-02 10:00 UTC),
        )
    }

    #[tokio::test]
    async fn test_register_counts_and_rejects_duplicates() {
        let repo = MemoryEventRepository::new();
        let event = repo.create_event(sample_event()).await.unwrap();

        let updated = repo
            .register(registration_for(&event, "11144477735", "Ana"))
            .await
            .unwrap();
        assert_eq!(updated.registrations_count, 1);

        let err = repo
            .register(registration_for(&event, "111.444.777-35", "Ana"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Duplicate));
        assert_eq!(repo.get_event(event.id).await.unwrap().unwrap().registrations_count, 1);
    }

    #[tokio::test]
    async fn test_register_respects_capacity() {
        let repo = MemoryEventRepository::new();
        let event = repo.create_event(sample_event()).await.unwrap();

        repo.register(registration_for(&event, "11144477735", "Ana")).await.unwrap();
        repo.register(registration_for(&event, "52998224725", "Bia")).await.unwrap();
        let err = repo
            .register(registration_for(&event, "39053344705", "Caio"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::CapacityReached));
    }

    #[tokio::test]
    async fn test_delete_decrements_counter() {
        let repo = MemoryEventRepository::new();
        let event = repo.create_event(sample_event()).await.unwrap();
        let cpf = Cpf::parse("11144477735").unwrap();

        repo.register(registration_for(&event, cpf.as_str(), "Ana")).await.unwrap();
        let updated = repo.delete_registration(event.id, &cpf).await.unwrap();
        assert_eq!(updated.registrations_count, 0);
        assert!(repo.get_registration(event.id, &cpf).await.unwrap().is_none());

        let err = repo.delete_registration(event.id, &cpf).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound));
    }

    #[tokio::test]
    async fn test_save_event_keeps_counter() {
        let repo = MemoryEventRepository::new();
        let event = repo.create_event(sample_event()).await.unwrap();
        repo.register(registration_for(&event, "11144477735", "Ana")).await.unwrap();

        let mut edited = event.clone();
        edited.name = "Renamed".to_string();
        edited.registrations_count = 99;
        let saved = repo.save_event(&edited).await.unwrap();

        assert_eq!(saved.name, "Renamed");
        assert_eq!(saved.registrations_count, 1);
    }

    #[tokio::test]
    async fn test_attendance_and_flags() {
        let repo = MemoryEventRepository::new();
        let event = repo.create_event(sample_event()).await.unwrap();
        let cpf = Cpf::parse("11144477735").unwrap();
        repo.register(registration_for(&event, cpf.as_str(), "Ana")).await.unwrap();

        for hour in [9, 14] {
            let record = AttendanceRecord {
                timestamp: datetime!(2025-05-11 0:00 UTC) + time::Duration::hours(hour),
                session: None,
                recorded_by: Some("admin@example.com".to_string()),
            };
            repo.append_attendance(event.id, &cpf, record, None).await.unwrap();
        }
        let stored = repo.get_registration(event.id, &cpf).await.unwrap().unwrap();
        assert_eq!(stored.attendances.len(), 2);
        assert!(stored.attendances[0].timestamp < stored.attendances[1].timestamp);

        assert!(repo.toggle_final_activity(event.id, &cpf).await.unwrap());
        assert!(!repo.toggle_final_activity(event.id, &cpf).await.unwrap());

        assert_eq!(repo.mark_certificates_issued(event.id, &[cpf.clone()]).await.unwrap(), 1);
        assert_eq!(repo.mark_certificates_issued(event.id, &[cpf]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_attendance_interval_is_checked_under_the_lock() {
        let repo = MemoryEventRepository::new();
        let event = repo.create_event(sample_event()).await.unwrap();
        let cpf = Cpf::parse("11144477735").unwrap();
        repo.register(registration_for(&event, cpf.as_str(), "Ana")).await.unwrap();

        let at = |hour: i64| AttendanceRecord {
            timestamp: datetime!(2025-05-11 8:00 UTC) + time::Duration::hours(hour),
            session: None,
            recorded_by: None,
        };
        let interval = Some(time::Duration::hours(4));

        repo.append_attendance(event.id, &cpf, at(0), interval).await.unwrap();
        assert!(matches!(
            repo.append_attendance(event.id, &cpf, at(3), interval).await,
            Err(DatabaseError::TooSoon)
        ));
        let stored = repo.append_attendance(event.id, &cpf, at(4), interval).await.unwrap();
        assert_eq!(stored.attendances.len(), 2);

        let missing = Cpf::parse("52998224725").unwrap();
        assert!(matches!(
            repo.append_attendance(event.id, &missing, at(9), interval).await,
            Err(DatabaseError::NotFound)
        ));
    }
}
