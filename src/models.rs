use crate::model::role::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReqDto {
    #[schema(example = "Somchai Dee")]
    pub full_name: String,
    #[schema(example = "somchai@company.com")]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "somchai@company.com")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    /// User email
    pub sub: String,
    pub role: Role,
    pub exp: usize,
    pub jti: String,
}
