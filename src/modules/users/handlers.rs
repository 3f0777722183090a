use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use time::OffsetDateTime;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::{DatabaseError, NewUser, UpdateUserRole, User, UserRole};
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;
use crate::middleware::{AdminUser, CurrentUser};

/// Name shown before the user fills in a profile: the e-mail's local part.
fn display_name(name: Option<String>, email: &str) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string())
}

/// First sign-in creates the application record; later calls return it.
pub async fn register_self(
    State(state): State<AppState>,
    user: CurrentUser,
    i18n: I18n,
    payload: Option<Json<NewUser>>,
) -> AppResult<(StatusCode, Json<User>)> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    payload
        .validate()
        .map_err(|errors| AppError::validation(&errors, &i18n))?;

    if let Some(existing) = user.account(&state).await? {
        return Ok((StatusCode::OK, Json(existing)));
    }

    let role = if state.env.app.bootstrap_admins.contains(&user.uid) {
        UserRole::Admin
    } else {
        UserRole::User
    };
    let record = User {
        uid: user.uid.clone(),
        name: display_name(payload.name, &user.email),
        email: user.email.to_lowercase(),
        role,
        created_at: OffsetDateTime::now_utc(),
    };

    match state.repo.create_user(record).await {
        Ok(created) => {
            tracing::info!(uid = %created.uid, role = ?created.role, "User record created");
            Ok((StatusCode::CREATED, Json(created)))
        }
        // Two tabs signing in at once; the other request won.
        Err(DatabaseError::Duplicate) => {
            let existing = user
                .account(&state)
                .await?
                .ok_or(AppError::Database(DatabaseError::NotFound))?;
            Ok((StatusCode::OK, Json(existing)))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.repo.list_users().await?))
}

pub async fn set_user_role(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    admin: AdminUser,
    i18n: I18n,
    Json(payload): Json<UpdateUserRole>,
) -> AppResult<Json<User>> {
    let user = state
        .repo
        .set_user_role(&uid, payload.role)
        .await
        .map_err(|err| match err {
            DatabaseError::NotFound => AppError::NotFound(i18n.get("user-not-found")),
            other => other.into(),
        })?;

    tracing::info!(uid = %user.uid, role = ?user.role, changed_by = %admin.user.uid, "User role changed");
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(display_name(Some(" Ana ".into()), "x@y.com"), "Ana");
        assert_eq!(display_name(Some("  ".into()), "maria@ufpi.edu.br"), "maria");
        assert_eq!(display_name(None, ""), "");
    }
}
