//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tower::ServiceExt;

use eventos_backend::config::Config;
use eventos_backend::db::{EventRepository, MemoryEventRepository, User, UserRole};
use eventos_backend::i18n::{init_i18n, SupportedLanguage};
use eventos_backend::{create_router, AppState};

pub const ADMIN_UID: &str = "admin-uid";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const MONITOR_UID: &str = "monitor-uid";
pub const OUTSIDER_UID: &str = "outsider-uid";

/// Valid CPFs, in the order tests use them.
pub const CPF_A: &str = "111.444.777-35";
pub const CPF_B: &str = "529.982.247-25";
pub const CPF_C: &str = "390.533.447-05";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn test_app() -> TestApp {
    test_app_with(Config::default()).await
}

/// App over an in-memory repository with one global admin already stored.
pub async fn test_app_with(config: Config) -> TestApp {
    let repo: Arc<dyn EventRepository> = Arc::new(MemoryEventRepository::new());
    repo.create_user(User {
        uid: ADMIN_UID.to_string(),
        name: "Admin".to_string(),
        email: ADMIN_EMAIL.to_string(),
        role: UserRole::Admin,
        created_at: OffsetDateTime::now_utc(),
    })
    .await
    .unwrap();

    let localizer = init_i18n(SupportedLanguage::Portuguese).unwrap();
    let state = AppState::new(repo, config, Arc::new(localizer));
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

pub fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap()
}

/// An event open for registration: starts in 10 days, deadline in 9.
pub fn event_payload(max_participants: i32) -> Value {
    let now = OffsetDateTime::now_utc();
    json!({
        "name": "Semana Acadêmica",
        "description": "Palestras e minicursos",
        "start_date": rfc3339(now + Duration::days(10)),
        "end_date": rfc3339(now + Duration::days(12)),
        "registration_deadline": rfc3339(now + Duration::days(9)),
        "max_participants": max_participants,
        "min_attendance_percent": 75,
        "total_sessions": 4,
        "requires_final_activity": false,
        "admins": [MONITOR_UID],
    })
}

pub fn registration_payload(cpf: &str, name: &str) -> Value {
    json!({
        "cpf": cpf,
        "nome": name,
        "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        "telefone": "(86) 99999-0000",
        "institution": "UFPI",
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
    pub content_type: Option<String>,
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(uid) = user {
            builder = builder.header("authorization", format!("Bearer {}", self.token_for(uid)));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            text,
            content_type,
        }
    }

    /// ID token the identity provider would hand `uid` after sign-in.
    pub fn token_for(&self, uid: &str) -> String {
        let email = format!("{}@example.com", uid);
        self.state
            .tokens
            .issue(uid, Some(email.as_str()), Duration::hours(1))
            .unwrap()
    }

    /// Send a request with raw headers and no minted token.
    pub async fn request_with_headers(&self, method: Method, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
            text: String::from_utf8_lossy(&bytes).to_string(),
            content_type: None,
        }
    }

    pub async fn get(&self, uri: &str, user: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, user, None).await
    }

    pub async fn post(&self, uri: &str, user: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, user, Some(body)).await
    }

    /// Create an event as the global admin and return its id.
    pub async fn create_event(&self, payload: Value) -> String {
        let response = self.post("/api/events", Some(ADMIN_UID), payload).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.body["id"].as_str().unwrap().to_string()
    }

    pub async fn register(&self, event_id: &str, cpf: &str, name: &str) -> TestResponse {
        self.post(
            &format!("/api/events/{}/registrations", event_id),
            None,
            registration_payload(cpf, name),
        )
        .await
    }
}
