use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::domain::Cpf;
use crate::error::AppResult;
use crate::i18n::I18n;
use crate::middleware::CurrentUser;
use crate::modules::events::handlers::find_managed_event;
use crate::modules::registrations::handlers::RegistrationView;

use super::csv;

#[derive(Debug, Default, Deserialize)]
pub struct EligibleQuery {
    /// Name filter, matched ignoring case and accents.
    pub q: Option<String>,
}

/// Lowercase without diacritics, so "José" matches "jose".
fn fold_name(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn matches_query(name: &str, query: Option<&str>) -> bool {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => fold_name(name).contains(&fold_name(q)),
        None => true,
    }
}

async fn eligible_for(
    state: &AppState,
    event_id: Uuid,
    user: &CurrentUser,
    i18n: &I18n,
    query: Option<&str>,
) -> AppResult<(Uuid, Vec<RegistrationView>)> {
    let event = find_managed_event(state, event_id, user, i18n).await?;
    let registrations = state.repo.list_registrations(event.id).await?;

    let eligible = registrations
        .into_iter()
        .filter(|registration| matches_query(&registration.name, query))
        .map(|registration| RegistrationView::new(&event, registration))
        .filter(|view| view.eligibility.eligible)
        .collect();

    Ok((event.id, eligible))
}

pub async fn eligible_participants(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<EligibleQuery>,
    user: CurrentUser,
    i18n: I18n,
) -> AppResult<Json<Vec<RegistrationView>>> {
    let (_, eligible) = eligible_for(&state, event_id, &user, &i18n, query.q.as_deref()).await?;
    Ok(Json(eligible))
}

pub async fn export_eligible_csv(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<EligibleQuery>,
    user: CurrentUser,
    i18n: I18n,
) -> AppResult<impl IntoResponse> {
    let (event_id, eligible) = eligible_for(&state, event_id, &user, &i18n, query.q.as_deref()).await?;
    tracing::info!(%event_id, rows = eligible.len(), "Exporting eligible participants");

    let disposition = format!("attachment; filename=\"certificados-{}.csv\"", event_id);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv::render(&eligible),
    ))
}

#[derive(Debug, Serialize)]
pub struct CertificatesIssued {
    pub eligible: usize,
    pub newly_issued: u64,
}

pub async fn issue_certificates(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    user: CurrentUser,
    i18n: I18n,
) -> AppResult<Json<CertificatesIssued>> {
    let (event_id, eligible) = eligible_for(&state, event_id, &user, &i18n, None).await?;
    let cpfs: Vec<Cpf> = eligible
        .iter()
        .map(|view| view.registration.cpf.clone())
        .collect();

    let newly_issued = state.repo.mark_certificates_issued(event_id, &cpfs).await?;
    tracing::info!(%event_id, eligible = cpfs.len(), newly_issued, "Certificates issued");

    Ok(Json(CertificatesIssued {
        eligible: cpfs.len(),
        newly_issued,
    }))
}
