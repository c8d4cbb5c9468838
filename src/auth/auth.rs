use crate::{auth::jwt::verify_token, config::Config, error::AppError, model::role::Role};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let token = bearer_token(req)?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal("Config missing".to_string()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|e| AppError::Unauthorized(format!("Invalid or expired token: {e}")))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role: claims.role,
    })
}

pub fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Unauthorized("Authorization header missing".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Authorization header must start with Bearer".to_string())
        })
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Forbidden: Admins only".to_string()))
        }
    }

    /// User an action applies to: admins may name anyone, employees only themselves.
    pub fn target_user(&self, requested: Option<u64>) -> Result<u64, AppError> {
        match requested {
            Some(id) if id != self.user_id => {
                self.require_admin()?;
                Ok(id)
            }
            _ => Ok(self.user_id),
        }
    }

    /// Admins see every record, employees only their own.
    pub fn require_owner_or_admin(&self, owner_id: u64) -> Result<(), AppError> {
        if self.is_admin() || owner_id == self.user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied".to_string()))
        }
    }
}
