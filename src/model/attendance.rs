use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Day label stored in `attendance_records.status`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum AttendanceStatus {
    #[serde(rename = "Present")]
    #[strum(serialize = "Present")]
    Present,
    #[serde(rename = "Half-day")]
    #[strum(serialize = "Half-day")]
    HalfDay,
    #[serde(rename = "Absent")]
    #[strum(serialize = "Absent")]
    Absent,
    #[serde(rename = "On Leave")]
    #[strum(serialize = "On Leave")]
    OnLeave,
    /// Never derived; only present when written by an admin.
    #[serde(rename = "Late")]
    #[strum(serialize = "Late")]
    Late,
}

/// One user-day of attendance.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceDay {
    pub id: u64,
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<NaiveDateTime>,
    pub check_out: Option<NaiveDateTime>,
    pub work_hours: Option<f64>,
    pub overtime_hours: Option<f64>,
    pub status: AttendanceStatus,
    pub shift_id: Option<u64>,
}

/// Raw row as stored; `status` is decoded into [`AttendanceStatus`] by the store.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceDayRow {
    pub attendance_id: u64,
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub work_hours: Option<f64>,
    pub overtime_hours: Option<f64>,
    pub status: String,
    pub shift_id: Option<u64>,
}

impl TryFrom<AttendanceDayRow> for AttendanceDay {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceDayRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.attendance_id,
            user_id: row.user_id,
            date: row.date,
            check_in: row.check_in_time,
            check_out: row.check_out_time,
            work_hours: row.work_hours,
            overtime_hours: row.overtime_hours,
            status: row.status.parse()?,
            shift_id: row.shift_id,
        })
    }
}

/// Attendance row joined with the owning user and shift, as listed by the API.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "attendance_id": 12,
    "user_id": 3,
    "date": "2026-01-05",
    "check_in_time": "2026-01-05T09:00:00",
    "check_out_time": "2026-01-05T17:00:00",
    "status": "Present",
    "shift_id": 1,
    "work_hours": 8.0,
    "overtime_hours": 0.0,
    "leave_type": null,
    "remarks": null,
    "full_name": "Somchai Dee",
    "department": "Engineering",
    "email": "somchai@company.com",
    "shift_name": "Day"
}))]
pub struct AttendanceRecord {
    pub attendance_id: u64,
    pub user_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: String,
    pub shift_id: Option<u64>,
    pub work_hours: Option<f64>,
    pub overtime_hours: Option<f64>,
    pub leave_type: Option<String>,
    pub remarks: Option<String>,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
    pub shift_name: Option<String>,
}
