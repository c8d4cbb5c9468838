use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// User as exposed by the API; the password hash never leaves the database layer.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "user_id": 3,
    "full_name": "Somchai Dee",
    "email": "somchai@company.com",
    "department": "Engineering",
    "role": "employee",
    "created_at": "2026-01-01T00:00:00Z"
}))]
pub struct User {
    pub user_id: u64,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    #[schema(example = "employee")]
    pub role: String,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub struct UserCredentials {
    pub user_id: u64,
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}
