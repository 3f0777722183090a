use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::OffsetDateTime;
use validator::Validate;

use crate::domain::Cpf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "attendance_session", rename_all = "lowercase")]
pub enum AttendanceSession {
    #[serde(rename = "manha")]
    Manha,
    #[serde(rename = "tarde")]
    Tarde,
    #[serde(rename = "noite")]
    Noite,
}

/// One recorded presence. Records are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub session: Option<AttendanceSession>,
    pub recorded_by: Option<String>,
}

/// A participant's enrollment in one event, keyed by CPF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub event_id: Uuid,
    pub cpf: Cpf,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub institution: String,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    pub attendances: Vec<AttendanceRecord>,
    pub final_activity_submitted: bool,
    /// Denormalized; eligibility is always recomputed from attendances.
    pub certificate_issued: bool,
}

impl Registration {
    pub fn new(event_id: Uuid, cpf: Cpf, payload: NewRegistration, now: OffsetDateTime) -> Self {
        Self {
            event_id,
            cpf,
            name: payload.name.trim().to_string(),
            email: payload.email.trim().to_lowercase(),
            phone: payload.phone.chars().filter(char::is_ascii_digit).collect(),
            institution: payload.institution.trim().to_string(),
            registered_at: now,
            attendances: Vec::new(),
            final_activity_submitted: false,
            certificate_issued: false,
        }
    }

    pub fn last_attendance(&self) -> Option<&AttendanceRecord> {
        self.attendances.last()
    }
}

/// Public registration form.
#[derive(Debug, Deserialize, Validate)]
pub struct NewRegistration {
    #[validate(custom(function = "crate::domain::validate_cpf"))]
    pub cpf: String,
    #[serde(alias = "nome")]
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default, alias = "telefone")]
    #[validate(length(max = 20))]
    pub phone: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub institution: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewAttendance {
    pub session: Option<AttendanceSession>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_new_registration_normalizes_fields() {
        let payload = NewRegistration {
            cpf: "111.444.777-35".to_string(),
            name: "  Maria Souza ".to_string(),
            email: "Maria@Example.COM".to_string(),
            phone: "(86) 99999-1234".to_string(),
            institution: "UFDPar".to_string(),
        };
        assert!(payload.validate().is_ok());

        let cpf = Cpf::parse(&payload.cpf).unwrap();
        let now = datetime!(2025-05-01 12:00 UTC);
        let registration = Registration::new(Uuid::new_v4(), cpf, payload, now);

        assert_eq!(registration.cpf.as_str(), "11144477735");
        assert_eq!(registration.name, "Maria Souza");
        assert_eq!(registration.email, "maria@example.com");
        assert_eq!(registration.phone, "86999991234");
        assert!(registration.attendances.is_empty());
        assert!(!registration.certificate_issued);
        assert!(registration.last_attendance().is_none());
    }

    #[test]
    fn test_invalid_cpf_fails_validation() {
        let payload: NewRegistration = serde_json::from_value(serde_json::json!({
            "cpf": "123.456.789-00",
            "nome": "João",
            "email": "joao@example.com"
        }))
        .unwrap();
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("cpf"));
    }

    #[test]
    fn test_session_wire_names() {
        let record: AttendanceRecord = serde_json::from_value(serde_json::json!({
            "timestamp": "2025-05-01T12:00:00Z",
            "session": "tarde",
            "recorded_by": "admin@example.com"
        }))
        .unwrap();
        assert_eq!(record.session, Some(AttendanceSession::Tarde));
    }
}
