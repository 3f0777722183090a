use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::app_state::AppState;
use crate::auth::AuthError;
use crate::db::{Event, User};
use crate::error::{AppError, AppResult};
use crate::i18n::I18n;

/// The signed-in caller, taken from a verified `Authorization: Bearer` ID token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub uid: String,
    pub email: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match state.tokens.verify_header(header) {
            Ok(claims) => {
                tracing::Span::current().record("uid", claims.sub.as_str());
                Ok(CurrentUser {
                    uid: claims.sub,
                    email: claims.email.unwrap_or_default(),
                })
            }
            Err(err) => {
                let i18n = I18n::from_parts(parts, state);
                let key = match err {
                    AuthError::MissingToken => "auth-required",
                    AuthError::TokenExpired | AuthError::InvalidToken(_) => {
                        tracing::debug!(error = %err, "Rejected ID token");
                        "auth-invalid"
                    }
                };
                Err(AppError::Authentication(i18n.get(key)))
            }
        }
    }
}

impl CurrentUser {
    /// Stored account, if the caller has completed first sign-in.
    pub async fn account(&self, state: &AppState) -> AppResult<Option<User>> {
        Ok(state.repo.get_user(&self.uid).await?)
    }

    /// Global administrators manage every event; monitors only the events
    /// that list them.
    pub async fn ensure_event_admin(&self, state: &AppState, event: &Event, i18n: &I18n) -> AppResult<()> {
        if event.is_managed_by(&self.uid) {
            return Ok(());
        }
        match self.account(state).await? {
            Some(user) if user.is_admin() => Ok(()),
            _ => Err(AppError::Authorization(i18n.get("event-admin-required"))),
        }
    }
}

/// A signed-in caller whose stored role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub identity: CurrentUser,
    pub user: User,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = CurrentUser::from_request_parts(parts, state).await?;

        match identity.account(state).await? {
            Some(user) if user.is_admin() => Ok(AdminUser { identity, user }),
            _ => {
                let i18n = I18n::from_parts(parts, state);
                tracing::warn!(uid = %identity.uid, "Non-admin attempted an admin operation");
                Err(AppError::Authorization(i18n.get("admin-required")))
            }
        }
    }
}
