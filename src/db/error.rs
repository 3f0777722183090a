use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate record")]
    Duplicate,

    #[error("Event has reached its participant limit")]
    CapacityReached,

    #[error("Attendance already recorded within the minimum interval")]
    TooSoon,

    #[error("Stored record is malformed: {0}")]
    CorruptRecord(String),
}

pub type DbResult<T> = Result<T, DatabaseError>;
