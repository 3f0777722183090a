use async_trait::async_trait;
use std::collections::HashMap;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use super::EventRepository;
use crate::db::error::{DatabaseError, DbResult};
use crate::db::models::{
    AttendanceRecord, AttendanceSession, Event, Registration, User, UserRole,
};
use crate::domain::Cpf;

const EVENT_COLUMNS: &str = r#"
    id, name, description, start_date, end_date, registration_deadline,
    max_participants, registrations_count, status, min_attendance_percent,
    total_sessions, requires_final_activity, created_by, admins,
    contact_email, contact_phone, image_url, created_at, updated_at
"#;

const REGISTRATION_COLUMNS: &str = r#"
    event_id, cpf, name, email, phone, institution, registered_at,
    final_activity_submitted, certificate_issued
"#;

#[derive(sqlx::FromRow)]
struct RegistrationRow {
    event_id: Uuid,
    cpf: String,
    name: String,
    email: String,
    phone: String,
    institution: String,
    registered_at: OffsetDateTime,
    final_activity_submitted: bool,
    certificate_issued: bool,
}

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    event_id: Uuid,
    cpf: String,
    recorded_at: OffsetDateTime,
    session: Option<AttendanceSession>,
    recorded_by: Option<String>,
}

impl RegistrationRow {
    fn into_registration(self, attendances: Vec<AttendanceRecord>) -> DbResult<Registration> {
        let cpf = Cpf::parse(&self.cpf)
            .ok_or_else(|| DatabaseError::CorruptRecord(format!("invalid CPF in event {}", self.event_id)))?;

        Ok(Registration {
            event_id: self.event_id,
            cpf,
            name: self.name,
            email: self.email,
            phone: self.phone,
            institution: self.institution,
            registered_at: self.registered_at,
            attendances,
            final_activity_submitted: self.final_activity_submitted,
            certificate_issued: self.certificate_issued,
        })
    }
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        AttendanceRecord {
            timestamp: row.recorded_at,
            session: row.session,
            recorded_by: row.recorded_by,
        }
    }
}

/// Postgres-backed repository. Attendance records live in their own table and
/// are ordered by insertion id.
pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_event_for_update(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> DbResult<Event> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(DatabaseError::NotFound)
    }

    async fn set_counter(
        tx: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
        delta: i32,
    ) -> DbResult<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET registrations_count = GREATEST(registrations_count + $1, 0), updated_at = NOW()
            WHERE id = $2
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(delta)
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(event)
    }

    async fn attendances_for(&self, event_id: Uuid, cpf: &str) -> DbResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT event_id, cpf, recorded_at, session, recorded_by
            FROM attendance_records
            WHERE event_id = $1 AND cpf = $2
            ORDER BY id
            "#,
        )
        .bind(event_id)
        .bind(cpf)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AttendanceRecord::from).collect())
    }

    /// Attach attendance records to a batch of registration rows with one query.
    async fn hydrate(&self, rows: Vec<RegistrationRow>) -> DbResult<Vec<Registration>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let event_ids: Vec<Uuid> = rows.iter().map(|r| r.event_id).collect();
        let cpfs: Vec<String> = rows.iter().map(|r| r.cpf.clone()).collect();

        let attendance_rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT a.event_id, a.cpf, a.recorded_at, a.session, a.recorded_by
            FROM attendance_records a
            JOIN UNNEST($1::uuid[], $2::text[]) AS k(event_id, cpf)
              ON a.event_id = k.event_id AND a.cpf = k.cpf
            ORDER BY a.id
            "#,
        )
        .bind(&event_ids)
        .bind(&cpfs)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<(Uuid, String), Vec<AttendanceRecord>> = HashMap::new();
        for row in attendance_rows {
            grouped
                .entry((row.event_id, row.cpf.clone()))
                .or_default()
                .push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let attendances = grouped.remove(&(row.event_id, row.cpf.clone())).unwrap_or_default();
                row.into_registration(attendances)
            })
            .collect()
    }
}

fn map_unique_violation(err: sqlx::Error) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DatabaseError::Duplicate,
        _ => DatabaseError::Sqlx(err),
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_events(&self) -> DbResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date ASC NULLS LAST, name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn get_event(&self, id: Uuid) -> DbResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn create_event(&self, event: Event) -> DbResult<Event> {
        sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (
                id, name, description, start_date, end_date, registration_deadline,
                max_participants, registrations_count, status, min_attendance_percent,
                total_sessions, requires_final_activity, created_by, admins,
                contact_email, contact_phone, image_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.registration_deadline)
        .bind(event.max_participants)
        .bind(event.status)
        .bind(event.min_attendance_percent)
        .bind(event.total_sessions)
        .bind(event.requires_final_activity)
        .bind(&event.created_by)
        .bind(&event.admins)
        .bind(&event.contact_email)
        .bind(&event.contact_phone)
        .bind(&event.image_url)
        .bind(event.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn save_event(&self, event: &Event) -> DbResult<Event> {
        sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET name = $2, description = $3, start_date = $4, end_date = $5,
                registration_deadline = $6, max_participants = $7, status = $8,
                min_attendance_percent = $9, total_sessions = $10,
                requires_final_activity = $11, admins = $12, contact_email = $13,
                contact_phone = $14, image_url = $15, updated_at = NOW()
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.registration_deadline)
        .bind(event.max_participants)
        .bind(event.status)
        .bind(event.min_attendance_percent)
        .bind(event.total_sessions)
        .bind(event.requires_final_activity)
        .bind(&event.admins)
        .bind(&event.contact_email)
        .bind(&event.contact_phone)
        .bind(&event.image_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound)
    }

    async fn register(&self, registration: Registration) -> DbResult<Event> {
        let mut tx = self.pool.begin().await?;

        let event = Self::fetch_event_for_update(&mut tx, registration.event_id).await?;
        if event.is_full() {
            return Err(DatabaseError::CapacityReached);
        }

        let inserted = sqlx::query(&format!(
            r#"
            INSERT INTO registrations ({REGISTRATION_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, FALSE)
            ON CONFLICT (event_id, cpf) DO NOTHING
            "#
        ))
        .bind(registration.event_id)
        .bind(registration.cpf.as_str())
        .bind(&registration.name)
        .bind(&registration.email)
        .bind(&registration.phone)
        .bind(&registration.institution)
        .bind(registration.registered_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DatabaseError::Duplicate);
        }

        let event = Self::set_counter(&mut tx, registration.event_id, 1).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn get_registration(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 AND cpf = $2"
        ))
        .bind(event_id)
        .bind(cpf.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let attendances = self.attendances_for(event_id, cpf.as_str()).await?;
                row.into_registration(attendances).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn list_registrations(&self, event_id: Uuid) -> DbResult<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event_id = $1 ORDER BY name, cpf"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn registrations_by_cpf(&self, cpf: &Cpf) -> DbResult<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE cpf = $1 ORDER BY registered_at DESC"
        ))
        .bind(cpf.as_str())
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn delete_registration(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<Event> {
        let mut tx = self.pool.begin().await?;

        Self::fetch_event_for_update(&mut tx, event_id).await?;
        let deleted = sqlx::query("DELETE FROM registrations WHERE event_id = $1 AND cpf = $2")
            .bind(event_id)
            .bind(cpf.as_str())
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(DatabaseError::NotFound);
        }

        let event = Self::set_counter(&mut tx, event_id, -1).await?;
        tx.commit().await?;
        Ok(event)
    }

    async fn append_attendance(
        &self,
        event_id: Uuid,
        cpf: &Cpf,
        record: AttendanceRecord,
        min_interval: Option<Duration>,
    ) -> DbResult<Registration> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent marks for the same participant.
        let locked: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM registrations WHERE event_id = $1 AND cpf = $2 FOR UPDATE",
        )
        .bind(event_id)
        .bind(cpf.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(DatabaseError::NotFound);
        }

        if let Some(interval) = min_interval {
            let last: Option<OffsetDateTime> = sqlx::query_scalar(
                "SELECT MAX(recorded_at) FROM attendance_records WHERE event_id = $1 AND cpf = $2",
            )
            .bind(event_id)
            .bind(cpf.as_str())
            .fetch_one(&mut *tx)
            .await?;

            if last.is_some_and(|last| record.timestamp - last < interval) {
                return Err(DatabaseError::TooSoon);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO attendance_records (event_id, cpf, recorded_at, session, recorded_by)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event_id)
        .bind(cpf.as_str())
        .bind(record.timestamp)
        .bind(record.session)
        .bind(&record.recorded_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_registration(event_id, cpf)
            .await?
            .ok_or(DatabaseError::NotFound)
    }

    async fn toggle_final_activity(&self, event_id: Uuid, cpf: &Cpf) -> DbResult<bool> {
        let value: Option<bool> = sqlx::query_scalar(
            r#"
            UPDATE registrations
            SET final_activity_submitted = NOT final_activity_submitted
            WHERE event_id = $1 AND cpf = $2
            RETURNING final_activity_submitted
            "#,
        )
        .bind(event_id)
        .bind(cpf.as_str())
        .fetch_optional(&self.pool)
        .await?;

        value.ok_or(DatabaseError::NotFound)
    }

    async fn mark_certificates_issued(&self, event_id: Uuid, cpfs: &[Cpf]) -> DbResult<u64> {
        let cpfs: Vec<String> = cpfs.iter().map(|cpf| cpf.as_str().to_string()).collect();
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET certificate_issued = TRUE
            WHERE event_id = $1 AND cpf = ANY($2) AND certificate_issued = FALSE
            "#,
        )
        .bind(event_id)
        .bind(&cpfs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn get_user(&self, uid: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT uid, name, email, role, created_at FROM users WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, user: User) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (uid, name, email, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING uid, name, email, role, created_at
            "#,
        )
        .bind(&user.uid)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT uid, name, email, role, created_at FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn set_user_role(&self, uid: &str, role: UserRole) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $2
            WHERE uid = $1
            RETURNING uid, name, email, role, created_at
            "#,
        )
        .bind(uid)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NotFound)
    }
}
