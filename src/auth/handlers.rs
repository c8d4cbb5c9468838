use crate::{
    auth::{
        jwt::generate_access_token,
        password::{hash_password, verify_password},
    },
    config::Config,
    db::is_duplicate_key,
    error::{AppError, AppResult},
    model::{role::Role, user::UserCredentials},
    models::{LoginReqDto, RegisterReqDto},
};
use actix_web::{HttpResponse, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

fn validate_registration(req: &RegisterReqDto) -> Result<(), AppError> {
    if req.full_name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    if !req.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    if req.password != req.confirm_password {
        return Err(AppError::Validation(
            "Password and confirm password do not match".to_string(),
        ));
    }

    Ok(())
}

/// User registration handler
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReqDto,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully",
            "user_id": 3
        })),
        (status = 400, description = "Missing fields or password mismatch"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(pool, payload), fields(email = %payload.email))]
pub async fn register(
    pool: web::Data<MySqlPool>,
    payload: web::Json<RegisterReqDto>,
) -> AppResult<HttpResponse> {
    validate_registration(&payload)?;

    let email = payload.email.trim().to_lowercase();

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(pool.get_ref())
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let hashed = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        AppError::Internal("Failed to register user".to_string())
    })?;

    // Self-registration never grants admin
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
    .bind(Role::Employee.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            e.into()
        }
    })?;

    info!(user_id = result.last_insert_id(), "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user_id": result.last_insert_id()
    })))
}

/// Login handler, issues a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Login successful", body = Object, example = json!({
            "message": "Login successful",
            "token": "eyJhbGciOiJIUzI1NiJ9...",
            "user": {
                "user_id": 3,
                "full_name": "Somchai Dee",
                "email": "somchai@company.com",
                "role": "employee"
            }
        })),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid password"),
        (status = 404, description = "User not found")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, payload), fields(email = %payload.email))]
pub async fn login(
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<LoginReqDto>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Missing email or password".to_string()));
    }

    let user = sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT user_id, full_name, email, password, role
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(payload.email.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| {
        info!("Login failed: user not found");
        AppError::NotFound("User not found".to_string())
    })?;

    debug!(user_id = user.user_id, "Verifying password");

    if let Err(e) = verify_password(&payload.password, &user.password) {
        info!(error = %e, "Login failed: password mismatch");
        return Err(AppError::Unauthorized("Invalid password".to_string()));
    }

    let role: Role = user.role.parse().map_err(|_| {
        error!(user_id = user.user_id, role = %user.role, "Stored role is not recognised");
        AppError::Internal("Invalid stored role".to_string())
    })?;

    let token = generate_access_token(
        user.user_id,
        user.email.clone(),
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        AppError::Internal("Failed to issue token".to_string())
    })?;

    info!(user_id = user.user_id, "Login successful");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "token": token,
        "user": {
            "user_id": user.user_id,
            "full_name": user.full_name,
            "email": user.email,
            "role": role,
        }
    })))
}
