use crate::model::attendance::AttendanceStatus;
use chrono::NaiveDateTime;

/// Tolerance used when comparing stored hour values against thresholds.
const HOURS_EPSILON: f64 = 1e-9;

/// Policy constants for deriving a day's hours and status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendancePolicy {
    /// Hours above which time counts as overtime.
    pub standard_hours: f64,
    /// Worked hours that mark the day as a half day.
    pub half_day_hours: f64,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            standard_hours: 8.0,
            half_day_hours: 4.0,
        }
    }
}

/// Hours and status computed at check-out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySummary {
    pub work_hours: f64,
    pub overtime_hours: f64,
    pub status: AttendanceStatus,
}

/// Hundredths of an hour in `seconds`, rounding half away from zero.
fn centi_hours(seconds: i64) -> i64 {
    (seconds.abs() * 100 + 1800) / 3600 * seconds.signum()
}

/// Hundredths of an hour in a stored two-decimal hour value.
fn to_centi(hours: f64) -> i64 {
    (hours * 100.0).round() as i64
}

fn from_centi(centi: i64) -> f64 {
    centi as f64 / 100.0
}

impl AttendancePolicy {
    /// Elapsed time between the two instants in hours, rounded to two decimals.
    pub fn work_hours(&self, check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
        from_centi(centi_hours((check_out - check_in).num_seconds()))
    }

    pub fn overtime_hours(&self, work_hours: f64) -> f64 {
        from_centi((to_centi(work_hours) - to_centi(self.standard_hours)).max(0))
    }

    fn is_half_day(&self, work_hours: f64) -> bool {
        (work_hours - self.half_day_hours).abs() < HOURS_EPSILON
    }

    /// Status written at check-out. Absent and Late are never assigned here.
    pub fn status_at_check_out(&self, work_hours: f64) -> AttendanceStatus {
        if self.is_half_day(work_hours) {
            AttendanceStatus::HalfDay
        } else {
            AttendanceStatus::Present
        }
    }

    /// Caller guarantees `check_out > check_in`.
    pub fn summarize(&self, check_in: NaiveDateTime, check_out: NaiveDateTime) -> DaySummary {
        let work_hours = self.work_hours(check_in, check_out);
        DaySummary {
            work_hours,
            overtime_hours: self.overtime_hours(work_hours),
            status: self.status_at_check_out(work_hours),
        }
    }

    /// Status a stored row reads as. Only applies once work hours are known.
    pub fn reconcile(&self, work_hours: Option<f64>, stored: AttendanceStatus) -> AttendanceStatus {
        let Some(work_hours) = work_hours else {
            return stored;
        };

        if self.is_half_day(work_hours) {
            AttendanceStatus::HalfDay
        } else if work_hours < self.half_day_hours && stored != AttendanceStatus::OnLeave {
            AttendanceStatus::Absent
        } else {
            stored
        }
    }

    /// Same as [`reconcile`](Self::reconcile) for a raw stored label.
    /// Unknown labels are passed through untouched.
    pub fn reconcile_label(&self, work_hours: Option<f64>, stored: &str) -> String {
        match stored.parse::<AttendanceStatus>() {
            Ok(status) => self.reconcile(work_hours, status).to_string(),
            Err(_) => stored.to_string(),
        }
    }

    /// SQL expression yielding the reconciled status of `attendance_records`
    /// aliased as `ar`. Mirrors [`reconcile`](Self::reconcile).
    pub fn reconciled_status_sql(&self) -> String {
        format!(
            "CASE \
                WHEN ar.work_hours IS NULL THEN ar.status \
                WHEN ABS(ar.work_hours - {half}) < {eps} THEN 'Half-day' \
                WHEN ar.work_hours < {half} AND ar.status <> 'On Leave' THEN 'Absent' \
                ELSE ar.status \
            END",
            half = self.half_day_hours,
            eps = HOURS_EPSILON,
        )
    }
}
