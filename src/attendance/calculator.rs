use super::{
    AttendanceError,
    policy::AttendancePolicy,
    store::{AttendanceStore, CheckOutWrite, LeaveWrite},
};
use crate::model::{
    attendance::{AttendanceDay, AttendanceStatus},
    leave::LeaveType,
};
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    CheckedIn { time: NaiveDateTime },
    /// The day already had a check-in; nothing was written.
    AlreadyCheckedIn { time: NaiveDateTime },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutOutcome {
    CheckedOut {
        time: NaiveDateTime,
        work_hours: f64,
        overtime_hours: f64,
        status: AttendanceStatus,
    },
    /// The day already had a check-out; nothing was written.
    AlreadyCheckedOut { time: NaiveDateTime },
}

/// Drives the Empty -> CheckedIn -> CheckedOut state machine of one user-day.
pub struct AttendanceDayCalculator {
    store: Arc<dyn AttendanceStore>,
    policy: AttendancePolicy,
    default_shift_id: u64,
    max_leave_days: u32,
}

impl AttendanceDayCalculator {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        policy: AttendancePolicy,
        default_shift_id: u64,
        max_leave_days: u32,
    ) -> Self {
        Self {
            store,
            policy,
            default_shift_id,
            max_leave_days,
        }
    }

    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    pub async fn record_check_in(
        &self,
        user_id: u64,
        date: NaiveDate,
        timestamp: NaiveDateTime,
        shift_id: Option<u64>,
    ) -> Result<CheckInOutcome, AttendanceError> {
        let shift_id = shift_id.unwrap_or(self.default_shift_id);

        let written = match self.store.get(user_id, date).await? {
            Some(day) => {
                if let Some(time) = day.check_in {
                    debug!(user_id, %date, %time, "Already checked in");
                    return Ok(CheckInOutcome::AlreadyCheckedIn { time });
                }
                // row pre-created without a check-in (e.g. by an admin)
                self.store.fill_check_in(user_id, date, timestamp).await?
            }
            None => {
                self.store
                    .insert_check_in(user_id, date, timestamp, shift_id)
                    .await?
                    // a concurrent request may have created an empty row
                    || self.store.fill_check_in(user_id, date, timestamp).await?
            }
        };

        if written {
            info!(user_id, %date, time = %timestamp, "Checked in");
            return Ok(CheckInOutcome::CheckedIn { time: timestamp });
        }

        // Lost a race with another check-in for the same day.
        match self.store.get(user_id, date).await?.and_then(|d| d.check_in) {
            Some(time) => {
                warn!(user_id, %date, %time, "Concurrent check-in detected");
                Ok(CheckInOutcome::AlreadyCheckedIn { time })
            }
            None => Err(AttendanceError::Conflict { user_id, date }),
        }
    }

    pub async fn record_check_out(
        &self,
        user_id: u64,
        date: NaiveDate,
        timestamp: NaiveDateTime,
    ) -> Result<CheckOutOutcome, AttendanceError> {
        let day = self
            .store
            .get(user_id, date)
            .await?
            .ok_or(AttendanceError::NoCheckIn { user_id, date })?;

        if let Some(time) = day.check_out {
            debug!(user_id, %date, %time, "Already checked out");
            return Ok(CheckOutOutcome::AlreadyCheckedOut { time });
        }

        let check_in = day
            .check_in
            .ok_or(AttendanceError::NoCheckIn { user_id, date })?;

        if timestamp <= check_in {
            return Err(AttendanceError::InvalidOrder {
                check_in,
                check_out: timestamp,
            });
        }

        let summary = self.policy.summarize(check_in, timestamp);
        let write = CheckOutWrite {
            expected_check_in: check_in,
            check_out: timestamp,
            work_hours: summary.work_hours,
            overtime_hours: summary.overtime_hours,
            status: summary.status,
        };

        if self.store.complete_check_out(user_id, date, &write).await? {
            info!(
                user_id,
                %date,
                time = %timestamp,
                work_hours = summary.work_hours,
                overtime_hours = summary.overtime_hours,
                status = %summary.status,
                "Checked out"
            );
            return Ok(CheckOutOutcome::CheckedOut {
                time: timestamp,
                work_hours: summary.work_hours,
                overtime_hours: summary.overtime_hours,
                status: summary.status,
            });
        }

        // The row changed between read and write.
        match self.store.get(user_id, date).await? {
            Some(AttendanceDay {
                check_out: Some(time),
                ..
            }) => {
                warn!(user_id, %date, %time, "Concurrent check-out detected");
                Ok(CheckOutOutcome::AlreadyCheckedOut { time })
            }
            Some(AttendanceDay {
                check_in: Some(_), ..
            }) => Err(AttendanceError::Conflict { user_id, date }),
            _ => Err(AttendanceError::NoCheckIn { user_id, date }),
        }
    }

    /// Overwrites every day in `start..=end` with On Leave.
    pub async fn mark_leave(
        &self,
        user_id: u64,
        start: NaiveDate,
        end: NaiveDate,
        leave_type: LeaveType,
        remarks: Option<String>,
    ) -> Result<usize, AttendanceError> {
        if end < start {
            return Err(AttendanceError::Validation(
                "End date cannot be earlier than start date".to_string(),
            ));
        }

        let days = (end - start).num_days() + 1;
        if days > i64::from(self.max_leave_days) {
            return Err(AttendanceError::Validation(format!(
                "Leave cannot span more than {} days",
                self.max_leave_days
            )));
        }

        let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
        let count = dates.len();

        self.store
            .mark_leave(&LeaveWrite {
                user_id,
                dates,
                leave_type,
                remarks,
            })
            .await?;

        info!(user_id, %start, %end, %leave_type, days = count, "Leave marked");
        Ok(count)
    }
}
