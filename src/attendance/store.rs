use crate::{
    db::is_foreign_key_violation,
    model::{
        attendance::{AttendanceDay, AttendanceStatus},
        leave::LeaveType,
    },
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("user or shift does not exist")]
    UnknownReference(#[source] sqlx::Error),

    #[error("stored status is not recognised: {0}")]
    InvalidStatus(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_foreign_key_violation(&err) {
            StoreError::UnknownReference(err)
        } else {
            StoreError::Database(err)
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fields written when a day is checked out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckOutWrite {
    /// Check-in the caller computed against; the write is skipped if it changed.
    pub expected_check_in: NaiveDateTime,
    pub check_out: NaiveDateTime,
    pub work_hours: f64,
    pub overtime_hours: f64,
    pub status: AttendanceStatus,
}

/// Leave written across an inclusive date range.
#[derive(Debug, Clone)]
pub struct LeaveWrite {
    pub user_id: u64,
    pub dates: Vec<NaiveDate>,
    pub leave_type: LeaveType,
    pub remarks: Option<String>,
}

/// Persistence for one-row-per-(user, date) attendance.
///
/// Writes are conditional so concurrent requests for the same user-day cannot
/// overwrite each other: each returns `false` when another writer got there first.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn get(&self, user_id: u64, date: NaiveDate) -> StoreResult<Option<AttendanceDay>>;

    /// Creates the row with a check-in. `false` if a row for the day already exists.
    async fn insert_check_in(
        &self,
        user_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
        shift_id: u64,
    ) -> StoreResult<bool>;

    /// Sets the check-in of an existing row that has none yet.
    async fn fill_check_in(&self, user_id: u64, date: NaiveDate, at: NaiveDateTime)
    -> StoreResult<bool>;

    /// Writes check-out fields if the row is still checked in with the expected check-in.
    async fn complete_check_out(
        &self,
        user_id: u64,
        date: NaiveDate,
        write: &CheckOutWrite,
    ) -> StoreResult<bool>;

    /// Marks every date as On Leave, creating rows as needed. All or nothing.
    async fn mark_leave(&self, leave: &LeaveWrite) -> StoreResult<()>;
}
