use crate::{
    auth::{auth::AuthUser, password::hash_password},
    config::Config,
    db::is_duplicate_key,
    error::{AppError, AppResult},
    model::{role::Role, user::User},
    utils::db_utils::{BindValues, SqlValue, build_update_sql, execute_update},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::{MySql, MySqlPool};
use tracing::{debug, error, info, instrument};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: [&str; 4] = ["full_name", "email", "department", "role"];

const USER_COLUMNS: &str = "user_id, full_name, email, department, role, created_at";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// `admin` or `employee`
    pub role: Option<String>,
    pub department: Option<String>,
    /// Matches part of the name or email
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 12)]
    pub total: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "Somchai Dee")]
    pub full_name: String,
    #[schema(example = "somchai@company.com", format = "email")]
    pub email: String,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    /// Defaults to `employee`
    pub role: Option<Role>,
}

fn user_filters(query: &UserQuery) -> AppResult<(String, Vec<SqlValue>)> {
    let mut conditions = Vec::new();
    let mut bindings = Vec::new();

    if let Some(role) = query.role.as_deref().filter(|r| !r.is_empty()) {
        let role: Role = role
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid role: {role}")))?;
        conditions.push("role = ?");
        bindings.push(SqlValue::String(role.to_string()));
    }

    if let Some(department) = query.department.as_deref().filter(|d| !d.is_empty()) {
        conditions.push("department = ?");
        bindings.push(SqlValue::String(department.to_string()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(full_name LIKE ? OR email LIKE ?)");
        let like = format!("%{search}%");
        bindings.push(SqlValue::String(like.clone()));
        bindings.push(SqlValue::String(like));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    Ok((where_clause, bindings))
}

/// Normalises the editable fields of a user update.
fn prepare_user_update(payload: Value) -> AppResult<Value> {
    let Value::Object(mut fields) = payload else {
        return Err(AppError::Validation(
            "Payload must be a JSON object".to_string(),
        ));
    };

    if let Some(role) = fields.get("role") {
        let valid = role.as_str().is_some_and(|r| r.parse::<Role>().is_ok());
        if !valid {
            return Err(AppError::Validation(format!("Invalid role: {role}")));
        }
    }

    if let Some(email) = fields.get_mut("email") {
        let normalised = email
            .as_str()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| e.contains('@'))
            .ok_or_else(|| AppError::Validation("Invalid email address".to_string()))?;
        *email = Value::String(normalised);
    }

    if let Some(name) = fields.get("full_name") {
        if name.as_str().is_none_or(|n| n.trim().is_empty()) {
            return Err(AppError::Validation("full_name cannot be empty".to_string()));
        }
    }

    Ok(Value::Object(fields))
}

async fn user_exists(pool: &MySqlPool, user_id: u64) -> AppResult<bool> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 400, description = "Invalid role filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
#[instrument(name = "users_list", skip_all, fields(caller = _auth.user_id))]
pub async fn list_users(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> AppResult<HttpResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = u64::from(page - 1) * u64::from(per_page);

    let (where_clause, bindings) = user_filters(&query)?;

    let count_sql = format!("SELECT COUNT(*) FROM users {where_clause}");
    debug!(sql = %count_sql, bindings = ?bindings, "Counting users");

    let total = sqlx::query_scalar::<MySql, i64>(&count_sql)
        .bind_values(bindings.iter().cloned())
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "SELECT {USER_COLUMNS} FROM users {where_clause} ORDER BY full_name ASC, user_id ASC LIMIT ? OFFSET ?"
    );

    let data = sqlx::query_as::<MySql, User>(&data_sql)
        .bind_values(bindings)
        .bind(u64::from(per_page))
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get one user
#[utoipa::path(
    get,
    path = "/api/users/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
pub async fn get_user(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"
    ))
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(user))
}

/// Create a user with the default password (admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User created successfully",
            "user_id": 7,
            "default_password": "Aa!12345"
        })),
        (status = 400, description = "Missing fields"),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Email already registered")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
#[instrument(name = "users_create", skip_all, fields(caller = auth.user_id))]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateUserRequest>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;

    let email = payload.email.trim().to_lowercase();
    if payload.full_name.trim().is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "full_name and a valid email are required".to_string(),
        ));
    }

    let hashed = hash_password(&config.default_user_password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AppError::Internal("Failed to create user".to_string())
    })?;

    let role = payload.role.unwrap_or(Role::Employee);

    let result = sqlx::query(
        r#"
        INSERT INTO users (full_name, email, password, department, role)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.full_name.trim())
    .bind(&email)
    .bind(hashed)
    .bind(payload.department.as_deref())
    .bind(role.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            e.into()
        }
    })?;

    let user_id = result.last_insert_id();
    info!(user_id, %role, "User created by admin");

    Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully",
        "user_id": user_id,
        "default_password": config.default_user_password,
    })))
}

/// Update a user (admin only)
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    request_body(content = Object, description = "Any of: full_name, email, department, role", example = json!({
        "department": "Finance",
        "role": "admin"
    })),
    responses(
        (status = 200, description = "User updated", body = Object, example = json!({
            "message": "User updated successfully"
        })),
        (status = 400, description = "Unknown or invalid field"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
#[instrument(name = "users_update", skip_all, fields(caller = auth.user_id))]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    let payload = prepare_user_update(body.into_inner())?;
    let update = build_update_sql("users", &payload, &UPDATABLE_COLUMNS, "user_id", user_id)?;

    if !user_exists(pool.get_ref(), user_id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    execute_update(pool.get_ref(), update).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            e.into()
        }
    })?;

    info!(user_id, "User updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "User updated successfully"
    })))
}

/// Delete a user and their attendance (admin only)
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(
        ("user_id", Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = Object, example = json!({
            "message": "User deleted successfully"
        })),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Users"
)]
#[instrument(name = "users_delete", skip_all, fields(caller = auth.user_id))]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    if user_id == auth.user_id {
        return Err(AppError::Validation(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM users WHERE user_id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    info!(user_id, "User deleted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "User deleted successfully"
    })))
}
