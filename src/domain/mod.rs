//! Pure rules shared by every handler: CPF validation, date normalization
//! and certificate eligibility.

pub mod cpf;
pub mod eligibility;
pub mod timestamp;

pub use cpf::{cpf_digits, format_cpf, is_valid_cpf, validate_cpf, Cpf};
pub use eligibility::{compute_eligibility, Eligibility, DEFAULT_MIN_ATTENDANCE_PERCENT};
pub use timestamp::{
    format_brazilian_datetime, normalize_timestamp, parse_date_string, StoreTimestamp, TimestampValue,
};
