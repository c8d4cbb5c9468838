//! Check-in/check-out bookkeeping for one user-day.

pub mod calculator;
pub mod clock;
#[cfg(test)]
pub mod memory_store;
pub mod mysql_store;
pub mod policy;
pub mod store;

use chrono::{NaiveDate, NaiveDateTime};
use store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("{0}")]
    Validation(String),

    #[error("No check-in found for {date}")]
    NoCheckIn { user_id: u64, date: NaiveDate },

    #[error("Check-out time {check_out} must be after check-in time {check_in}")]
    InvalidOrder {
        check_in: NaiveDateTime,
        check_out: NaiveDateTime,
    },

    #[error("Attendance for {date} was modified concurrently, retry")]
    Conflict { user_id: u64, date: NaiveDate },

    #[error(transparent)]
    Store(#[from] StoreError),
}
