use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{Event, EventStatus, NewEvent, UpdateEvent, UpdateEventAdmins};
use crate::domain::{normalize_timestamp, TimestampValue};
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::i18n_args;
use crate::middleware::{AdminUser, CurrentUser};

/// Event as shown to clients, with the status adjusted for the current time.
#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub effective_status: EventStatus,
    /// `None` for events without a participant cap.
    pub spots_left: Option<i32>,
    pub registration_open: bool,
}

impl EventView {
    pub fn new(event: Event, now: OffsetDateTime) -> Self {
        let spots_left = (event.max_participants > 0)
            .then(|| (event.max_participants - event.registrations_count).max(0));
        let registration_open = event.check_registration_open(now).is_ok() && !event.is_full();
        Self {
            effective_status: event.effective_status(now),
            spots_left,
            registration_open,
            event,
        }
    }
}

pub(crate) async fn find_event(state: &AppState, id: Uuid, i18n: &I18n) -> AppResult<Event> {
    state
        .repo
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n.get("event-not-found")))
}

/// Load an event the caller is allowed to manage.
pub(crate) async fn find_managed_event(
    state: &AppState,
    id: Uuid,
    user: &CurrentUser,
    i18n: &I18n,
) -> AppResult<Event> {
    let event = find_event(state, id, i18n).await?;
    user.ensure_event_admin(state, &event, i18n).await?;
    Ok(event)
}

/// A present but unparseable date is rejected; only absence means "no date".
fn resolve_date(
    field: &str,
    value: Option<&TimestampValue>,
    i18n: &I18n,
) -> AppResult<Option<OffsetDateTime>> {
    match value {
        None => Ok(None),
        Some(value) => normalize_timestamp(value).map(Some).ok_or_else(|| {
            AppError::Validation(i18n.get_with_args("invalid-date", &i18n_args!("field" => field)))
        }),
    }
}

fn check_date_order(event: &Event, i18n: &I18n) -> AppResult<()> {
    if let (Some(start), Some(end)) = (event.start_date, event.end_date) {
        if end < start {
            return Err(AppError::Validation(
                i18n.get_with_args("invalid-date", &i18n_args!("field" => "end_date")),
            ));
        }
    }
    Ok(())
}

fn normalize_admins(admins: Vec<String>) -> Vec<String> {
    let mut admins: Vec<String> = admins
        .into_iter()
        .map(|uid| uid.trim().to_string())
        .filter(|uid| !uid.is_empty())
        .collect();
    admins.sort();
    admins.dedup();
    admins
}

pub async fn list_events(State(state): State<AppState>) -> AppResult<Json<Vec<EventView>>> {
    let now = OffsetDateTime::now_utc();
    let events = state.repo.list_events().await?;
    Ok(Json(events.into_iter().map(|event| EventView::new(event, now)).collect()))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    i18n: I18n,
) -> AppResult<Json<EventView>> {
    let event = find_event(&state, id, &i18n).await?;
    Ok(Json(EventView::new(event, OffsetDateTime::now_utc())))
}

pub async fn create_event(
    State(state): State<AppState>,
    admin: AdminUser,
    i18n: I18n,
    Json(payload): Json<NewEvent>,
) -> AppResult<(StatusCode, Json<EventView>)> {
    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, &i18n))?;

    let now = OffsetDateTime::now_utc();
    let event = Event {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        description: payload.description,
        start_date: resolve_date("start_date", payload.start_date.as_ref(), &i18n)?,
        end_date: resolve_date("end_date", payload.end_date.as_ref(), &i18n)?,
        registration_deadline: resolve_date(
            "registration_deadline",
            payload.registration_deadline.as_ref(),
            &i18n,
        )?,
        max_participants: payload.max_participants,
        registrations_count: 0,
        status: payload.status,
        min_attendance_percent: payload.min_attendance_percent,
        total_sessions: payload.total_sessions,
        requires_final_activity: payload.requires_final_activity,
        created_by: Some(admin.identity.uid.clone()),
        admins: normalize_admins(payload.admins),
        contact_email: payload.contact_email,
        contact_phone: payload.contact_phone,
        image_url: payload.image_url,
        created_at: now,
        updated_at: now,
    };
    check_date_order(&event, &i18n)?;

    let event = state.repo.create_event(event).await?;
    tracing::info!(event_id = %event.id, created_by = %admin.identity.uid, "Event created");

    Ok((StatusCode::CREATED, Json(EventView::new(event, now))))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    i18n: I18n,
    Json(payload): Json<UpdateEvent>,
) -> AppResult<Json<EventView>> {
    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, &i18n))?;

    let mut event = find_managed_event(&state, id, &user, &i18n).await?;

    if let Some(name) = payload.name {
        event.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        event.description = description;
    }
    if let Some(start) = resolve_date("start_date", payload.start_date.as_ref(), &i18n)? {
        event.start_date = Some(start);
    }
    if let Some(end) = resolve_date("end_date", payload.end_date.as_ref(), &i18n)? {
        event.end_date = Some(end);
    }
    if let Some(deadline) = resolve_date(
        "registration_deadline",
        payload.registration_deadline.as_ref(),
        &i18n,
    )? {
        event.registration_deadline = Some(deadline);
    }
    if let Some(max) = payload.max_participants {
        event.max_participants = max;
    }
    if let Some(status) = payload.status {
        event.status = status;
    }
    if let Some(percent) = payload.min_attendance_percent {
        event.min_attendance_percent = percent;
    }
    if let Some(sessions) = payload.total_sessions {
        event.total_sessions = sessions;
    }
    if let Some(required) = payload.requires_final_activity {
        event.requires_final_activity = required;
    }
    if payload.contact_email.is_some() {
        event.contact_email = payload.contact_email;
    }
    if payload.contact_phone.is_some() {
        event.contact_phone = payload.contact_phone;
    }
    if payload.image_url.is_some() {
        event.image_url = payload.image_url;
    }
    check_date_order(&event, &i18n)?;

    let event = state.repo.save_event(&event).await?;
    tracing::info!(event_id = %event.id, updated_by = %user.uid, "Event updated");
    state.notify_change(&event);

    Ok(Json(EventView::new(event, OffsetDateTime::now_utc())))
}

pub async fn set_event_admins(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: CurrentUser,
    i18n: I18n,
    Json(payload): Json<UpdateEventAdmins>,
) -> AppResult<Json<EventView>> {
    let mut event = find_managed_event(&state, id, &user, &i18n).await?;
    event.admins = normalize_admins(payload.admins);

    let event = state.repo.save_event(&event).await?;
    tracing::info!(event_id = %event.id, admins = event.admins.len(), "Event admins replaced");

    Ok(Json(EventView::new(event, OffsetDateTime::now_utc())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::sample_event;
    use time::macros::datetime;

    #[test]
    fn test_event_view_spots_and_open_flag() {
        let mut event = sample_event();
        event.registrations_count = 1;
        let view = EventView::new(event, datetime!(2025-05-02 0:00 UTC));
        assert_eq!(view.spots_left, Some(1));
        assert!(view.registration_open);

        let mut event = sample_event();
        event.max_participants = 0;
        let view = EventView::new(event, datetime!(2025-06-01 0:00 UTC));
        assert_eq!(view.spots_left, None);
        assert_eq!(view.effective_status, EventStatus::Ended);
        assert!(!view.registration_open);
    }

    #[test]
    fn test_normalize_admins_trims_and_dedups() {
        let admins = normalize_admins(vec![" b ".into(), "a".into(), "b".into(), "  ".into()]);
        assert_eq!(admins, vec!["a".to_string(), "b".to_string()]);
    }
}
