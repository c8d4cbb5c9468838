use crate::{
    attendance::{
        AttendanceError,
        calculator::{AttendanceDayCalculator, CheckInOutcome, CheckOutOutcome},
        clock::OfficeClock,
        policy::AttendancePolicy,
    },
    auth::auth::AuthUser,
    db::is_duplicate_key,
    error::{AppError, AppResult},
    model::{
        attendance::{AttendanceDay, AttendanceDayRow, AttendanceRecord, AttendanceStatus},
        leave::LeaveType,
    },
    utils::db_utils::{
        BindValues, SqlValue, build_update_sql, execute_update, parse_local_datetime,
    },
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use sqlx::{MySql, MySqlPool};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: [&str; 9] = [
    "date",
    "check_in_time",
    "check_out_time",
    "status",
    "shift_id",
    "work_hours",
    "overtime_hours",
    "leave_type",
    "remarks",
];

const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

fn opt_local_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) => parse_local_datetime(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime '{s}'"))),
    }
}

/// Empty bodies are allowed for check-in and check-out.
fn optional_body<T: DeserializeOwned + Default>(body: &web::Bytes) -> AppResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckInRequest {
    /// Admins may check in on behalf of another user.
    #[schema(example = 3)]
    pub user_id: Option<u64>,
    #[schema(example = 1)]
    pub shift_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckOutRequest {
    #[schema(example = 3)]
    pub user_id: Option<u64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkLeaveRequest {
    pub user_id: Option<u64>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    #[schema(example = "Family trip")]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAttendanceRequest {
    pub user_id: Option<u64>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "opt_local_datetime")]
    #[schema(example = "2026-03-02 09:00:00", value_type = Option<String>)]
    pub check_in_time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "opt_local_datetime")]
    #[schema(example = "2026-03-02 17:00:00", value_type = Option<String>)]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: Option<AttendanceStatus>,
    pub shift_id: Option<u64>,
    pub work_hours: Option<f64>,
    pub overtime_hours: Option<f64>,
    pub leave_type: Option<LeaveType>,
    pub remarks: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Matches part of the user's full name
    pub search: Option<String>,
    /// Derived status, e.g. `Present` or `Half-day`
    pub status: Option<String>,
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub end_date: Option<NaiveDate>,
    /// Admin only
    pub user_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Row values for a manually created record after deriving hours and status.
#[derive(Debug, PartialEq)]
struct ManualEntry {
    work_hours: Option<f64>,
    overtime_hours: Option<f64>,
    status: AttendanceStatus,
}

fn resolve_manual_entry(
    policy: &AttendancePolicy,
    req: &CreateAttendanceRequest,
) -> AppResult<ManualEntry> {
    if let (Some(check_in), Some(check_out)) = (req.check_in_time, req.check_out_time) {
        if check_out <= check_in {
            return Err(AttendanceError::InvalidOrder {
                check_in,
                check_out,
            }
            .into());
        }

        let summary = policy.summarize(check_in, check_out);
        return Ok(ManualEntry {
            work_hours: Some(summary.work_hours),
            overtime_hours: Some(summary.overtime_hours),
            status: req.status.unwrap_or(summary.status),
        });
    }

    if req.check_out_time.is_some() {
        return Err(AppError::Validation(
            "check_out_time requires check_in_time".to_string(),
        ));
    }

    let default_status = if req.leave_type.is_some() {
        AttendanceStatus::OnLeave
    } else if req.check_in_time.is_some() {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Absent
    };

    Ok(ManualEntry {
        work_hours: req.work_hours,
        overtime_hours: req.overtime_hours,
        status: req.status.unwrap_or(default_status),
    })
}

fn validate_label<T: std::str::FromStr>(
    payload: &Map<String, Value>,
    key: &str,
    nullable: bool,
) -> AppResult<()> {
    match payload.get(key) {
        None => Ok(()),
        Some(Value::Null) if nullable => Ok(()),
        Some(Value::String(s)) if s.parse::<T>().is_ok() => Ok(()),
        Some(other) => Err(AppError::Validation(format!("Invalid {key}: {other}"))),
    }
}

fn payload_datetime(
    payload: &Map<String, Value>,
    key: &str,
    current: Option<NaiveDateTime>,
) -> AppResult<Option<NaiveDateTime>> {
    match payload.get(key) {
        None => Ok(current),
        Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => parse_local_datetime(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {key}: {s}"))),
        Some(other) => Err(AppError::Validation(format!("Invalid {key}: {other}"))),
    }
}

/// Validates a partial update and, when either timestamp changes, recomputes
/// the derived hours (and status unless the caller sets one).
fn prepare_update(
    policy: &AttendancePolicy,
    existing: &AttendanceDay,
    payload: Value,
) -> AppResult<Value> {
    let Value::Object(mut fields) = payload else {
        return Err(AppError::Validation(
            "Payload must be a JSON object".to_string(),
        ));
    };

    validate_label::<AttendanceStatus>(&fields, "status", false)?;
    validate_label::<LeaveType>(&fields, "leave_type", true)?;

    let times_changed =
        fields.contains_key("check_in_time") || fields.contains_key("check_out_time");
    if !times_changed {
        return Ok(Value::Object(fields));
    }

    let check_in = payload_datetime(&fields, "check_in_time", existing.check_in)?;
    let check_out = payload_datetime(&fields, "check_out_time", existing.check_out)?;

    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) => {
            if check_out <= check_in {
                return Err(AttendanceError::InvalidOrder {
                    check_in,
                    check_out,
                }
                .into());
            }
            let summary = policy.summarize(check_in, check_out);
            fields.insert("work_hours".to_string(), json!(summary.work_hours));
            fields.insert("overtime_hours".to_string(), json!(summary.overtime_hours));
            fields
                .entry("status")
                .or_insert_with(|| json!(summary.status));
        }
        (None, Some(_)) => {
            return Err(AppError::Validation(
                "check_out_time requires check_in_time".to_string(),
            ));
        }
        _ => {
            fields.insert("work_hours".to_string(), Value::Null);
            fields.insert("overtime_hours".to_string(), Value::Null);
        }
    }

    Ok(Value::Object(fields))
}

pub(crate) fn record_select(policy: &AttendancePolicy) -> String {
    format!(
        r#"
        SELECT ar.attendance_id, ar.user_id, ar.date, ar.check_in_time, ar.check_out_time,
               {status} AS status, ar.shift_id, ar.work_hours, ar.overtime_hours,
               ar.leave_type, ar.remarks,
               u.full_name, u.department, u.email, s.shift_name
        FROM attendance_records ar
        LEFT JOIN users u ON u.user_id = ar.user_id
        LEFT JOIN shifts s ON s.shift_id = ar.shift_id
        "#,
        status = policy.reconciled_status_sql()
    )
}

/// WHERE clause and its bindings for the list endpoint. `user_id` is already
/// resolved against the caller's role.
fn list_filters(
    policy: &AttendancePolicy,
    query: &AttendanceQuery,
    user_id: Option<u64>,
) -> AppResult<(String, Vec<SqlValue>)> {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    if let Some(user_id) = user_id {
        conditions.push("ar.user_id = ?".to_string());
        bindings.push(SqlValue::U64(user_id));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("u.full_name LIKE ?".to_string());
        bindings.push(SqlValue::String(format!("%{search}%")));
    }

    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        let status: AttendanceStatus = status
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid status: {status}")))?;
        conditions.push(format!("({}) = ?", policy.reconciled_status_sql()));
        bindings.push(SqlValue::String(status.to_string()));
    }

    match (query.start_date, query.end_date, query.date) {
        (Some(start), Some(end), _) => {
            if end < start {
                return Err(AppError::Validation(
                    "end_date cannot be earlier than start_date".to_string(),
                ));
            }
            conditions.push("ar.date BETWEEN ? AND ?".to_string());
            bindings.push(SqlValue::Date(start));
            bindings.push(SqlValue::Date(end));
        }
        (Some(_), None, _) | (None, Some(_), _) => {
            return Err(AppError::Validation(
                "start_date and end_date must be given together".to_string(),
            ));
        }
        (None, None, Some(date)) => {
            conditions.push("ar.date = ?".to_string());
            bindings.push(SqlValue::Date(date));
        }
        (None, None, None) => {}
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    Ok((where_clause, bindings))
}

async fn fetch_day(pool: &MySqlPool, attendance_id: u64) -> AppResult<AttendanceDay> {
    let row = sqlx::query_as::<_, AttendanceDayRow>(
        r#"
        SELECT attendance_id, user_id, date, check_in_time, check_out_time,
               work_hours, overtime_hours, status, shift_id
        FROM attendance_records
        WHERE attendance_id = ?
        "#,
    )
    .bind(attendance_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

    AttendanceDay::try_from(row)
        .map_err(|e| AppError::Internal(format!("Invalid stored attendance status: {e}")))
}

/// Check-in for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(content = CheckInRequest, description = "Optional; defaults to the caller and the default shift"),
    responses(
        (status = 200, description = "Checked in, or already checked in", body = Object, example = json!({
            "message": "Check-in successful",
            "time": "2026-03-02T09:00:00"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employees may only check themselves in"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_in", skip_all, fields(caller = auth.user_id))]
pub async fn check_in(
    auth: AuthUser,
    calculator: web::Data<AttendanceDayCalculator>,
    clock: web::Data<OfficeClock>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let req: CheckInRequest = optional_body(&body)?;
    let user_id = auth.target_user(req.user_id)?;

    let now = clock.stamp();
    let outcome = calculator
        .record_check_in(user_id, now.date, now.at, req.shift_id)
        .await?;

    let body = match outcome {
        CheckInOutcome::CheckedIn { time } => json!({
            "message": "Check-in successful",
            "time": time,
        }),
        CheckInOutcome::AlreadyCheckedIn { time } => json!({
            "message": "Already checked in today",
            "time": time,
        }),
    };

    Ok(HttpResponse::Ok().json(body))
}

/// Check-out for today
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body(content = CheckOutRequest, description = "Optional; defaults to the caller"),
    responses(
        (status = 200, description = "Checked out, or already checked out", body = Object, example = json!({
            "message": "Check-out successful",
            "time": "2026-03-02T17:00:00",
            "work_hours": 8.0,
            "overtime_hours": 0.0,
            "status": "Present"
        })),
        (status = 400, description = "No check-in for today, or check-out before check-in", body = Object, example = json!({
            "kind": "NoCheckInError",
            "message": "No check-in found for 2026-03-02",
            "user_id": 3,
            "date": "2026-03-02"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employees may only check themselves out"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_check_out", skip_all, fields(caller = auth.user_id))]
pub async fn check_out(
    auth: AuthUser,
    calculator: web::Data<AttendanceDayCalculator>,
    clock: web::Data<OfficeClock>,
    body: web::Bytes,
) -> AppResult<HttpResponse> {
    let req: CheckOutRequest = optional_body(&body)?;
    let user_id = auth.target_user(req.user_id)?;

    let now = clock.stamp();
    let outcome = calculator
        .record_check_out(user_id, now.date, now.at)
        .await?;

    let body = match outcome {
        CheckOutOutcome::CheckedOut {
            time,
            work_hours,
            overtime_hours,
            status,
        } => json!({
            "message": "Check-out successful",
            "time": time,
            "work_hours": work_hours,
            "overtime_hours": overtime_hours,
            "status": status,
        }),
        CheckOutOutcome::AlreadyCheckedOut { time } => json!({
            "message": "Already checked out today",
            "time": time,
        }),
    };

    Ok(HttpResponse::Ok().json(body))
}

/// Mark a range of days as leave
#[utoipa::path(
    post,
    path = "/api/attendance/leave",
    request_body = MarkLeaveRequest,
    responses(
        (status = 200, description = "Leave recorded", body = Object, example = json!({
            "message": "Leave marked successfully",
            "days": 3
        })),
        (status = 400, description = "Invalid date range or leave type"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employees may only mark their own leave")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_mark_leave", skip_all, fields(caller = auth.user_id))]
pub async fn mark_leave(
    auth: AuthUser,
    calculator: web::Data<AttendanceDayCalculator>,
    payload: web::Json<MarkLeaveRequest>,
) -> AppResult<HttpResponse> {
    let req = payload.into_inner();
    let user_id = auth.target_user(req.user_id)?;

    let days = calculator
        .mark_leave(
            user_id,
            req.start_date,
            req.end_date,
            req.leave_type,
            req.remarks,
        )
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave marked successfully",
        "days": days,
    })))
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AttendanceListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_list", skip_all, fields(caller = auth.user_id))]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    calculator: web::Data<AttendanceDayCalculator>,
    query: web::Query<AttendanceQuery>,
) -> AppResult<HttpResponse> {
    let policy = calculator.policy();

    let user_filter = if auth.is_admin() {
        query.user_id
    } else {
        Some(auth.target_user(query.user_id)?)
    };

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let offset = u64::from(page - 1) * u64::from(per_page);

    let (where_clause, bindings) = list_filters(policy, &query, user_filter)?;

    let count_sql = format!(
        r#"
        SELECT COUNT(*)
        FROM attendance_records ar
        LEFT JOIN users u ON u.user_id = ar.user_id
        {where_clause}
        "#
    );
    debug!(sql = %count_sql, bindings = ?bindings, "Counting attendance records");

    let total = sqlx::query_scalar::<MySql, i64>(&count_sql)
        .bind_values(bindings.iter().cloned())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "{} {where_clause} ORDER BY ar.date DESC, ar.attendance_id DESC LIMIT ? OFFSET ?",
        record_select(policy)
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching attendance records");

    let data = sqlx::query_as::<MySql, AttendanceRecord>(&data_sql)
        .bind_values(bindings)
        .bind(u64::from(per_page))
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get one attendance record
#[utoipa::path(
    get,
    path = "/api/attendance/{attendance_id}",
    params(
        ("attendance_id", Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Attendance record", body = AttendanceRecord),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_get", skip_all, fields(caller = auth.user_id))]
pub async fn get_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    calculator: web::Data<AttendanceDayCalculator>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let attendance_id = path.into_inner();

    let sql = format!(
        "{} WHERE ar.attendance_id = ?",
        record_select(calculator.policy())
    );
    let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
        .bind(attendance_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))?;

    auth.require_owner_or_admin(record.user_id)?;

    Ok(HttpResponse::Ok().json(record))
}

/// Create an attendance record manually
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CreateAttendanceRequest,
    responses(
        (status = 201, description = "Attendance record created", body = Object, example = json!({
            "message": "Attendance record created",
            "attendance_id": 12
        })),
        (status = 400, description = "Invalid times or fields"),
        (status = 403, description = "Employees may only create their own records"),
        (status = 409, description = "A record for this user and date already exists")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_create", skip_all, fields(caller = auth.user_id))]
pub async fn create_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    calculator: web::Data<AttendanceDayCalculator>,
    payload: web::Json<CreateAttendanceRequest>,
) -> AppResult<HttpResponse> {
    let user_id = auth.target_user(payload.user_id)?;
    let entry = resolve_manual_entry(calculator.policy(), &payload)?;

    let result = sqlx::query(
        r#"
        INSERT INTO attendance_records
            (user_id, date, check_in_time, check_out_time, status, shift_id,
             work_hours, overtime_hours, leave_type, remarks)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(payload.date)
    .bind(payload.check_in_time)
    .bind(payload.check_out_time)
    .bind(entry.status.as_ref())
    .bind(payload.shift_id)
    .bind(entry.work_hours)
    .bind(entry.overtime_hours)
    .bind(payload.leave_type.map(|t| t.to_string()))
    .bind(payload.remarks.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict(format!(
                "Attendance for user {user_id} on {} already exists",
                payload.date
            ))
        } else {
            e.into()
        }
    })?;

    let attendance_id = result.last_insert_id();
    info!(attendance_id, user_id, date = %payload.date, "Attendance record created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Attendance record created",
        "attendance_id": attendance_id,
    })))
}

/// Update an attendance record
#[utoipa::path(
    put,
    path = "/api/attendance/{attendance_id}",
    params(
        ("attendance_id", Path, description = "Attendance record ID")
    ),
    request_body(content = Object, description = "Any of: date, check_in_time, check_out_time, status, shift_id, work_hours, overtime_hours, leave_type, remarks", example = json!({
        "check_out_time": "2026-03-02 18:30:00",
        "remarks": "Stayed for release"
    })),
    responses(
        (status = 200, description = "Attendance record updated", body = Object, example = json!({
            "message": "Attendance record updated"
        })),
        (status = 400, description = "Unknown or invalid field"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Attendance record not found"),
        (status = 409, description = "Another record exists for this user and date")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_update", skip_all, fields(caller = auth.user_id))]
pub async fn update_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    calculator: web::Data<AttendanceDayCalculator>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    let attendance_id = path.into_inner();

    let existing = fetch_day(pool.get_ref(), attendance_id).await?;
    auth.require_owner_or_admin(existing.user_id)?;

    let payload = prepare_update(calculator.policy(), &existing, body.into_inner())?;
    let update = build_update_sql(
        "attendance_records",
        &payload,
        &UPDATABLE_COLUMNS,
        "attendance_id",
        attendance_id,
    )?;

    execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("Another record exists for this user and date".to_string())
        } else {
            e.into()
        }
    })?;

    info!(attendance_id, "Attendance record updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance record updated"
    })))
}

/// Delete an attendance record
#[utoipa::path(
    delete,
    path = "/api/attendance/{attendance_id}",
    params(
        ("attendance_id", Path, description = "Attendance record ID")
    ),
    responses(
        (status = 200, description = "Attendance record deleted", body = Object, example = json!({
            "message": "Attendance record deleted"
        })),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Attendance record not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "attendance_delete", skip_all, fields(caller = auth.user_id))]
pub async fn delete_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let attendance_id = path.into_inner();

    let existing = fetch_day(pool.get_ref(), attendance_id).await?;
    auth.require_owner_or_admin(existing.user_id)?;

    sqlx::query("DELETE FROM attendance_records WHERE attendance_id = ?")
        .bind(attendance_id)
        .execute(pool.get_ref())
        .await?;

    info!(attendance_id, user_id = existing.user_id, "Attendance record deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Attendance record deleted"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attendance::{
            clock::test_support::MutableClock,
            memory_store::{MemoryAttendanceStore, empty_day},
        },
        auth::jwt::generate_access_token,
        config::Config,
        model::role::Role,
    };
    use actix_web::{App, http::StatusCode, test as atest};
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};
    use std::sync::Arc;

    const EMPLOYEE: u64 = 3;
    const ADMIN: u64 = 1;

    fn ict() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn local(h: u32, m: u32) -> DateTime<Utc> {
        ict()
            .with_ymd_and_hms(2026, 3, 2, h, m, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn token(user_id: u64, role: Role) -> String {
        let config = Config::for_tests();
        let jwt = generate_access_token(
            user_id,
            format!("user{user_id}@company.com"),
            role,
            &config.jwt_secret,
            config.access_token_ttl,
        )
        .unwrap();
        format!("Bearer {jwt}")
    }

    struct Harness {
        store: Arc<MemoryAttendanceStore>,
        clock: Arc<MutableClock>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(MemoryAttendanceStore::new()),
                clock: Arc::new(MutableClock::new(local(9, 0))),
            }
        }

        fn app(
            &self,
        ) -> App<
            impl actix_web::dev::ServiceFactory<
                actix_web::dev::ServiceRequest,
                Config = (),
                Response = actix_web::dev::ServiceResponse,
                Error = actix_web::Error,
                InitError = (),
            > + use<>,
        > {
            let calculator = AttendanceDayCalculator::new(
                self.store.clone(),
                AttendancePolicy::default(),
                1,
                31,
            );
            let clock = OfficeClock::new(self.clock.clone(), ict());

            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(calculator))
                .app_data(web::Data::new(clock))
                .route("/check-in", web::post().to(check_in))
                .route("/check-out", web::post().to(check_out))
                .route("/leave", web::post().to(mark_leave))
        }
    }

    #[actix_web::test]
    async fn check_in_then_out_reports_hours_and_status() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post()
            .uri("/check-in")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Check-in successful");
        assert_eq!(body["time"], "2026-03-02T09:00:00");

        h.clock.set(local(13, 0));
        let req = atest::TestRequest::post()
            .uri("/check-out")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Check-out successful");
        assert_eq!(body["work_hours"], 4.0);
        assert_eq!(body["overtime_hours"], 0.0);
        assert_eq!(body["status"], "Half-day");

        let stored = h.store.row(EMPLOYEE, today()).unwrap();
        assert_eq!(stored.status, AttendanceStatus::HalfDay);
    }

    #[actix_web::test]
    async fn repeated_check_in_keeps_first_time() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        for _ in 0..2 {
            let req = atest::TestRequest::post()
                .uri("/check-in")
                .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
                .to_request();
            atest::call_service(&app, req).await;
            h.clock.set(local(9, 30));
        }

        let req = atest::TestRequest::post()
            .uri("/check-in")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Already checked in today");
        assert_eq!(body["time"], "2026-03-02T09:00:00");
        assert_eq!(h.store.len(), 1);
    }

    #[actix_web::test]
    async fn check_out_without_check_in_is_a_bad_request() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post()
            .uri("/check-out")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(body["kind"], "NoCheckInError");
        assert_eq!(body["date"], "2026-03-02");
    }

    #[actix_web::test]
    async fn employee_cannot_check_in_someone_else() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post()
            .uri("/check-in")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .set_json(json!({ "user_id": 99 }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(h.store.len(), 0);
    }

    #[actix_web::test]
    async fn admin_can_check_in_on_behalf_with_shift() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post()
            .uri("/check-in")
            .insert_header(("Authorization", token(ADMIN, Role::Admin)))
            .set_json(json!({ "user_id": EMPLOYEE, "shift_id": 2 }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let stored = h.store.row(EMPLOYEE, today()).unwrap();
        assert_eq!(stored.shift_id, Some(2));
        assert_eq!(stored.status, AttendanceStatus::Present);
    }

    #[actix_web::test]
    async fn requests_without_token_are_unauthorized() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post().uri("/check-in").to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn malformed_body_is_a_validation_error() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post()
            .uri("/check-in")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn leave_overwrites_existing_day() {
        let h = Harness::new();
        let mut day = empty_day(EMPLOYEE, today());
        day.status = AttendanceStatus::Present;
        h.store.put(day);
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post()
            .uri("/leave")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .set_json(json!({
                "start_date": "2026-03-02",
                "end_date": "2026-03-04",
                "leave_type": "Sick",
            }))
            .to_request();
        let body: Value = atest::call_and_read_body_json(&app, req).await;
        assert_eq!(body["days"], 3);

        assert_eq!(
            h.store.row(EMPLOYEE, today()).unwrap().status,
            AttendanceStatus::OnLeave
        );
        assert_eq!(h.store.len(), 3);
    }

    #[actix_web::test]
    async fn leave_with_reversed_range_is_rejected() {
        let h = Harness::new();
        let app = atest::init_service(h.app()).await;

        let req = atest::TestRequest::post()
            .uri("/leave")
            .insert_header(("Authorization", token(EMPLOYEE, Role::Employee)))
            .set_json(json!({
                "start_date": "2026-03-04",
                "end_date": "2026-03-02",
                "leave_type": "Annual",
            }))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.store.len(), 0);
    }

    fn create_request(check_in: Option<&str>, check_out: Option<&str>) -> CreateAttendanceRequest {
        serde_json::from_value(json!({
            "date": "2026-03-02",
            "check_in_time": check_in,
            "check_out_time": check_out,
        }))
        .unwrap()
    }

    #[test]
    fn manual_entry_derives_hours_from_times() {
        let req = create_request(Some("2026-03-02 09:00:00"), Some("2026-03-02 19:30:00"));
        let entry = resolve_manual_entry(&AttendancePolicy::default(), &req).unwrap();
        assert_eq!(entry.work_hours, Some(10.5));
        assert_eq!(entry.overtime_hours, Some(2.5));
        assert_eq!(entry.status, AttendanceStatus::Present);
    }

    #[test]
    fn manual_entry_rejects_out_before_in() {
        let req = create_request(Some("2026-03-02 09:00:00"), Some("2026-03-02 08:00:00"));
        let err = resolve_manual_entry(&AttendancePolicy::default(), &req).unwrap_err();
        assert_eq!(err.kind(), "InvalidOrderError");

        let req = create_request(None, Some("2026-03-02 08:00:00"));
        assert!(resolve_manual_entry(&AttendancePolicy::default(), &req).is_err());
    }

    #[test]
    fn manual_entry_without_times_is_absent() {
        let req = create_request(None, None);
        let entry = resolve_manual_entry(&AttendancePolicy::default(), &req).unwrap();
        assert_eq!(entry.status, AttendanceStatus::Absent);
        assert_eq!(entry.work_hours, None);
    }

    fn checked_in_day() -> AttendanceDay {
        let mut day = empty_day(EMPLOYEE, today());
        day.check_in = today().and_hms_opt(9, 0, 0);
        day.status = AttendanceStatus::Present;
        day
    }

    #[test]
    fn update_recomputes_hours_when_check_out_changes() {
        let payload = prepare_update(
            &AttendancePolicy::default(),
            &checked_in_day(),
            json!({ "check_out_time": "2026-03-02 13:00:00" }),
        )
        .unwrap();

        assert_eq!(payload["work_hours"], 4.0);
        assert_eq!(payload["overtime_hours"], 0.0);
        assert_eq!(payload["status"], "Half-day");
    }

    #[test]
    fn update_keeps_explicit_status() {
        let payload = prepare_update(
            &AttendancePolicy::default(),
            &checked_in_day(),
            json!({ "check_out_time": "2026-03-02 17:00:00", "status": "Late" }),
        )
        .unwrap();

        assert_eq!(payload["work_hours"], 8.0);
        assert_eq!(payload["status"], "Late");
    }

    #[test]
    fn update_rejects_unknown_labels_and_bad_order() {
        let policy = AttendancePolicy::default();
        assert!(prepare_update(&policy, &checked_in_day(), json!({ "status": "Sleeping" })).is_err());
        assert!(prepare_update(&policy, &checked_in_day(), json!({ "status": null })).is_err());
        assert!(
            prepare_update(&policy, &checked_in_day(), json!({ "leave_type": "Vacation" })).is_err()
        );
        assert!(
            prepare_update(
                &policy,
                &checked_in_day(),
                json!({ "check_out_time": "2026-03-02 08:00:00" })
            )
            .is_err()
        );
    }

    #[test]
    fn update_without_times_passes_through() {
        let payload = prepare_update(
            &AttendancePolicy::default(),
            &checked_in_day(),
            json!({ "remarks": "forgot badge" }),
        )
        .unwrap();
        assert_eq!(payload, json!({ "remarks": "forgot badge" }));
    }

    #[test]
    fn employee_list_filter_uses_derived_status() {
        let query = AttendanceQuery {
            status: Some("Half-day".to_string()),
            date: Some(today()),
            ..Default::default()
        };
        let (sql, bindings) =
            list_filters(&AttendancePolicy::default(), &query, Some(EMPLOYEE)).unwrap();

        assert!(sql.starts_with("WHERE ar.user_id = ?"));
        assert!(sql.contains("CASE"));
        assert!(sql.ends_with("ar.date = ?"));
        assert_eq!(
            bindings,
            vec![
                SqlValue::U64(EMPLOYEE),
                SqlValue::String("Half-day".to_string()),
                SqlValue::Date(today()),
            ]
        );
    }

    #[test]
    fn list_filters_validate_status_and_range() {
        let policy = AttendancePolicy::default();
        let bad_status = AttendanceQuery {
            status: Some("Asleep".to_string()),
            ..Default::default()
        };
        assert!(list_filters(&policy, &bad_status, None).is_err());

        let half_range = AttendanceQuery {
            start_date: Some(today()),
            ..Default::default()
        };
        assert!(list_filters(&policy, &half_range, None).is_err());

        let (sql, bindings) = list_filters(&policy, &AttendanceQuery::default(), None).unwrap();
        assert!(sql.is_empty());
        assert!(bindings.is_empty());
    }
}
