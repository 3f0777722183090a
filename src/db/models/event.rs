use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use crate::domain::{
    compute_eligibility, Eligibility, TimestampValue, DEFAULT_MIN_ATTENDANCE_PERCENT,
};

use super::Registration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "event_status")]
pub enum EventStatus {
    #[serde(rename = "aberto")]
    #[sqlx(rename = "aberto")]
    Open,
    #[serde(rename = "fechado")]
    #[sqlx(rename = "fechado")]
    TemporarilyClosed,
    #[serde(rename = "encerrado")]
    #[sqlx(rename = "encerrado")]
    Ended,
    #[serde(rename = "em andamento")]
    #[sqlx(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "em breve")]
    #[sqlx(rename = "em_breve")]
    ComingSoon,
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Open
    }
}

/// Why an event is not taking registrations right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationBlock {
    DeadlinePassed,
    Ended,
    TemporarilyClosed,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub registration_deadline: Option<OffsetDateTime>,
    /// Zero means unlimited.
    pub max_participants: i32,
    pub registrations_count: i32,
    pub status: EventStatus,
    pub min_attendance_percent: f64,
    pub total_sessions: i32,
    pub requires_final_activity: bool,
    pub created_by: Option<String>,
    /// Uids allowed to manage this event besides global admins.
    pub admins: Vec<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Event {
    /// The stored status, except that an event whose end date has passed is
    /// always reported as ended.
    pub fn effective_status(&self, now: OffsetDateTime) -> EventStatus {
        match self.end_date {
            Some(end) if end < now => EventStatus::Ended,
            _ => self.status,
        }
    }

    pub fn check_registration_open(&self, now: OffsetDateTime) -> Result<(), RegistrationBlock> {
        if matches!(self.registration_deadline, Some(deadline) if deadline < now) {
            return Err(RegistrationBlock::DeadlinePassed);
        }
        match self.effective_status(now) {
            EventStatus::Ended => Err(RegistrationBlock::Ended),
            EventStatus::TemporarilyClosed => Err(RegistrationBlock::TemporarilyClosed),
            _ => Ok(()),
        }
    }

    /// Advisory cap; the repository re-checks it when inserting.
    pub fn is_full(&self) -> bool {
        self.max_participants > 0 && self.registrations_count >= self.max_participants
    }

    pub fn is_managed_by(&self, uid: &str) -> bool {
        self.created_by.as_deref() == Some(uid) || self.admins.iter().any(|a| a == uid)
    }

    pub fn eligibility_of(&self, registration: &Registration) -> Eligibility {
        compute_eligibility(
            registration.attendances.len() as i64,
            i64::from(self.total_sessions),
            self.min_attendance_percent,
            self.requires_final_activity,
            registration.final_activity_submitted,
        )
    }
}

fn default_min_attendance_percent() -> f64 {
    DEFAULT_MIN_ATTENDANCE_PERCENT
}

/// Payload for creating an event. Field aliases accept documents exported
/// from the previous document store.
#[derive(Debug, Deserialize, Validate)]
pub struct NewEvent {
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<TimestampValue>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<TimestampValue>,
    #[serde(default, alias = "registrationDeadLine")]
    pub registration_deadline: Option<TimestampValue>,
    #[serde(default, alias = "maxParticipants")]
    #[validate(range(min = 0))]
    pub max_participants: i32,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default = "default_min_attendance_percent", alias = "minAttendancePercentForCertificate")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_attendance_percent: f64,
    #[serde(default, alias = "totalSessoes")]
    #[validate(range(min = 0))]
    pub total_sessions: i32,
    #[serde(default, alias = "requer_atividade_final")]
    pub requires_final_activity: bool,
    #[serde(default)]
    pub admins: Vec<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEvent {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "startDate")]
    pub start_date: Option<TimestampValue>,
    #[serde(alias = "endDate")]
    pub end_date: Option<TimestampValue>,
    #[serde(alias = "registrationDeadLine")]
    pub registration_deadline: Option<TimestampValue>,
    #[serde(alias = "maxParticipants")]
    #[validate(range(min = 0))]
    pub max_participants: Option<i32>,
    pub status: Option<EventStatus>,
    #[serde(alias = "minAttendancePercentForCertificate")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub min_attendance_percent: Option<f64>,
    #[serde(alias = "totalSessoes")]
    #[validate(range(min = 0))]
    pub total_sessions: Option<i32>,
    #[serde(alias = "requer_atividade_final")]
    pub requires_final_activity: Option<bool>,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventAdmins {
    pub admins: Vec<String>,
}
