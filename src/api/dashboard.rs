use crate::{
    api::attendance::record_select,
    attendance::{
        calculator::AttendanceDayCalculator, clock::OfficeClock, policy::AttendancePolicy,
    },
    auth::auth::AuthUser,
    error::AppResult,
    model::attendance::{AttendanceRecord, AttendanceStatus},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::{debug, instrument};
use utoipa::ToSchema;

const RECENT_LIMIT: u32 = 5;

#[derive(Serialize, ToSchema)]
pub struct DashboardResponse {
    #[schema(example = 25)]
    pub total_users: i64,
    #[schema(example = 18)]
    pub present_today: i64,
    #[schema(example = 2)]
    pub absent_today: i64,
    /// Present users as a percentage of all users, one decimal place.
    #[schema(example = 72.0)]
    pub attendance_rate: f64,
    pub recent_attendance: Vec<AttendanceRecord>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
}

#[derive(Debug, PartialEq)]
struct DayCounts {
    present: i64,
    absent: i64,
}

/// Counts today's rows by their derived status.
fn count_today(policy: &AttendancePolicy, rows: &[(Option<f64>, String)]) -> DayCounts {
    let mut counts = DayCounts {
        present: 0,
        absent: 0,
    };

    for (work_hours, stored) in rows {
        let label = policy.reconcile_label(*work_hours, stored);
        if label == AttendanceStatus::Present.as_ref() {
            counts.present += 1;
        } else if label == AttendanceStatus::Absent.as_ref() {
            counts.absent += 1;
        }
    }

    counts
}

fn attendance_rate(present: i64, total_users: i64) -> f64 {
    if total_users <= 0 {
        return 0.0;
    }
    let percent = present as f64 / total_users as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

/// Today's attendance summary
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Counts for today plus the latest records", body = DashboardResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
#[instrument(name = "dashboard", skip_all, fields(caller = _auth.user_id))]
pub async fn dashboard(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    calculator: web::Data<AttendanceDayCalculator>,
    clock: web::Data<OfficeClock>,
) -> AppResult<HttpResponse> {
    let policy = calculator.policy();
    let today = clock.today();

    let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await?;

    let rows = sqlx::query_as::<_, (Option<f64>, String)>(
        "SELECT work_hours, status FROM attendance_records WHERE date = ?",
    )
    .bind(today)
    .fetch_all(pool.get_ref())
    .await?;

    let counts = count_today(policy, &rows);
    debug!(%today, rows = rows.len(), ?counts, "Counted today's attendance");

    let recent_sql = format!(
        "{} ORDER BY ar.date DESC, ar.check_in_time DESC LIMIT ?",
        record_select(policy)
    );
    let recent_attendance = sqlx::query_as::<_, AttendanceRecord>(&recent_sql)
        .bind(RECENT_LIMIT)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(DashboardResponse {
        total_users,
        present_today: counts.present,
        absent_today: counts.absent,
        attendance_rate: attendance_rate(counts.present, total_users),
        recent_attendance,
        date: today,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_use_derived_status() {
        let rows = vec![
            (Some(8.0), "Present".to_string()),
            // stored as Present, reads as Half-day
            (Some(4.0), "Present".to_string()),
            // too short, reads as Absent
            (Some(2.5), "Present".to_string()),
            (None, "Present".to_string()),
            (Some(1.0), "On Leave".to_string()),
            (None, "Absent".to_string()),
        ];

        let counts = count_today(&AttendancePolicy::default(), &rows);
        assert_eq!(
            counts,
            DayCounts {
                present: 2,
                absent: 2
            }
        );
    }

    #[test]
    fn rate_is_a_percentage_with_one_decimal() {
        assert_eq!(attendance_rate(2, 3), 66.7);
        assert_eq!(attendance_rate(5, 5), 100.0);
        assert_eq!(attendance_rate(0, 0), 0.0);
    }
}
