use crate::{auth::auth::AuthUser, error::AppResult, model::shift::Shift};
use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;

/// List shifts
#[utoipa::path(
    get,
    path = "/api/shifts",
    responses(
        (status = 200, description = "All shifts ordered by name", body = [Shift]),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Shifts"
)]
pub async fn list_shifts(_auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let shifts = sqlx::query_as::<_, Shift>(
        "SELECT shift_id, shift_name, start_time, end_time FROM shifts ORDER BY shift_name",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(shifts))
}
