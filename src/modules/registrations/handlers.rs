use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{
    AttendanceRecord, DatabaseError, Event, EventStatus, NewAttendance, NewRegistration,
    Registration, RegistrationBlock,
};
use crate::domain::{Cpf, Eligibility};
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::i18n_args;
use crate::middleware::CurrentUser;
use crate::modules::events::handlers::{find_event, find_managed_event};

/// Registration with its certificate standing for the owning event.
#[derive(Debug, Serialize)]
pub struct RegistrationView {
    #[serde(flatten)]
    pub registration: Registration,
    pub cpf_formatted: String,
    pub attendance_count: usize,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

impl RegistrationView {
    pub fn new(event: &Event, registration: Registration) -> Self {
        Self {
            cpf_formatted: registration.cpf.formatted(),
            attendance_count: registration.attendances.len(),
            eligibility: event.eligibility_of(&registration),
            registration,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrationCreated {
    pub message: String,
    pub registration: RegistrationView,
    pub registrations_count: i32,
}

fn parse_cpf(raw: &str, i18n: &I18n) -> AppResult<Cpf> {
    Cpf::parse(raw).ok_or_else(|| AppError::Validation(i18n.get("cpf-invalid")))
}

fn registration_not_found(err: DatabaseError, i18n: &I18n) -> AppError {
    match err {
        DatabaseError::NotFound => AppError::NotFound(i18n.get("registration-not-found")),
        other => other.into(),
    }
}

fn block_message(block: RegistrationBlock) -> &'static str {
    match block {
        RegistrationBlock::DeadlinePassed => "registration-deadline-passed",
        RegistrationBlock::Ended => "registration-event-ended",
        RegistrationBlock::TemporarilyClosed => "registration-temporarily-closed",
    }
}

/// Public sign-up. Checks run in a fixed order so the participant sees the
/// most relevant reason first: event closed, bad CPF, full, already in.
pub async fn register(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    i18n: I18n,
    Json(payload): Json<NewRegistration>,
) -> AppResult<(StatusCode, Json<RegistrationCreated>)> {
    let now = OffsetDateTime::now_utc();
    let event = find_event(&state, event_id, &i18n).await?;

    event
        .check_registration_open(now)
        .map_err(|block| AppError::Conflict(i18n.get(block_message(block))))?;

    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, &i18n))?;
    let cpf = parse_cpf(&payload.cpf, &i18n)?;

    if event.is_full() {
        return Err(AppError::Conflict(i18n.get("registration-full")));
    }

    let registration = Registration::new(event.id, cpf, payload, now);
    let updated = match state.repo.register(registration.clone()).await {
        Ok(updated) => updated,
        Err(DatabaseError::CapacityReached) => {
            return Err(AppError::Conflict(i18n.get("registration-full")))
        }
        Err(DatabaseError::Duplicate) => {
            return Err(AppError::Conflict(i18n.get("registration-duplicate")))
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(
        event_id = %updated.id,
        registrations = updated.registrations_count,
        "Registration created"
    );
    state.notify_change(&updated);

    Ok((
        StatusCode::CREATED,
        Json(RegistrationCreated {
            message: i18n.get("registration-created"),
            registrations_count: updated.registrations_count,
            registration: RegistrationView::new(&updated, registration),
        }),
    ))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    user: CurrentUser,
    i18n: I18n,
) -> AppResult<Json<Vec<RegistrationView>>> {
    let event = find_managed_event(&state, event_id, &user, &i18n).await?;
    let registrations = state.repo.list_registrations(event.id).await?;

    Ok(Json(
        registrations
            .into_iter()
            .map(|registration| RegistrationView::new(&event, registration))
            .collect(),
    ))
}

pub async fn delete_registration(
    State(state): State<AppState>,
    Path((event_id, cpf)): Path<(Uuid, String)>,
    user: CurrentUser,
    i18n: I18n,
) -> AppResult<StatusCode> {
    let cpf = parse_cpf(&cpf, &i18n)?;
    let event = find_managed_event(&state, event_id, &user, &i18n).await?;

    let updated = state
        .repo
        .delete_registration(event.id, &cpf)
        .await
        .map_err(|err| registration_not_found(err, &i18n))?;

    tracing::info!(event_id = %updated.id, deleted_by = %user.uid, "Registration deleted");
    state.notify_change(&updated);

    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_attendance(
    State(state): State<AppState>,
    Path((event_id, cpf)): Path<(Uuid, String)>,
    user: CurrentUser,
    i18n: I18n,
    Json(payload): Json<NewAttendance>,
) -> AppResult<(StatusCode, Json<RegistrationView>)> {
    let cpf = parse_cpf(&cpf, &i18n)?;
    let event = find_managed_event(&state, event_id, &user, &i18n).await?;
    let min_interval_hours = state.env.attendance.min_interval_hours;

    let recorded_by = if user.email.is_empty() { user.uid.clone() } else { user.email.clone() };
    let record = AttendanceRecord {
        timestamp: OffsetDateTime::now_utc(),
        session: payload.session,
        recorded_by: Some(recorded_by),
    };

    let registration = state
        .repo
        .append_attendance(event.id, &cpf, record, min_interval_hours.map(Duration::hours))
        .await
        .map_err(|err| match (err, min_interval_hours) {
            (DatabaseError::TooSoon, Some(hours)) => AppError::Conflict(
                i18n.get_with_args("attendance-too-soon", &i18n_args!("hours" => hours)),
            ),
            (err, _) => registration_not_found(err, &i18n),
        })?;

    tracing::info!(
        event_id = %event.id,
        attendances = registration.attendances.len(),
        "Attendance recorded"
    );

    Ok((StatusCode::CREATED, Json(RegistrationView::new(&event, registration))))
}

#[derive(Debug, Serialize)]
pub struct FinalActivityToggled {
    pub final_activity_submitted: bool,
}

pub async fn toggle_final_activity(
    State(state): State<AppState>,
    Path((event_id, cpf)): Path<(Uuid, String)>,
    user: CurrentUser,
    i18n: I18n,
) -> AppResult<Json<FinalActivityToggled>> {
    let cpf = parse_cpf(&cpf, &i18n)?;
    let event = find_managed_event(&state, event_id, &user, &i18n).await?;

    let final_activity_submitted = state
        .repo
        .toggle_final_activity(event.id, &cpf)
        .await
        .map_err(|err| registration_not_found(err, &i18n))?;

    Ok(Json(FinalActivityToggled {
        final_activity_submitted,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CpfQuery {
    pub cpf: String,
}

/// One line of a participant's "my registrations" page.
#[derive(Debug, Serialize)]
pub struct ParticipantRegistration {
    pub event_id: Uuid,
    pub event_name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub event_start_date: Option<OffsetDateTime>,
    pub event_status: EventStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    pub attendance_count: usize,
    pub final_activity_submitted: bool,
    pub certificate_issued: bool,
    #[serde(flatten)]
    pub eligibility: Eligibility,
}

pub async fn my_registrations(
    State(state): State<AppState>,
    Query(query): Query<CpfQuery>,
    i18n: I18n,
) -> AppResult<Json<Vec<ParticipantRegistration>>> {
    let cpf = parse_cpf(&query.cpf, &i18n)?;
    let now = OffsetDateTime::now_utc();

    let mut lines = Vec::new();
    for registration in state.repo.registrations_by_cpf(&cpf).await? {
        // Events deleted behind our back are skipped rather than failing the page.
        let Some(event) = state.repo.get_event(registration.event_id).await? else {
            tracing::warn!(event_id = %registration.event_id, "Registration points to a missing event");
            continue;
        };

        lines.push(ParticipantRegistration {
            event_id: event.id,
            event_name: event.name.clone(),
            event_start_date: event.start_date,
            event_status: event.effective_status(now),
            registered_at: registration.registered_at,
            attendance_count: registration.attendances.len(),
            final_activity_submitted: registration.final_activity_submitted,
            certificate_issued: registration.certificate_issued,
            eligibility: event.eligibility_of(&registration),
        });
    }

    Ok(Json(lines))
}
