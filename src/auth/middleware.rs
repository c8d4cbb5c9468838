use crate::auth::auth::{AuthUser, bearer_token};
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal("App config missing".to_string()))?;

    let verified = bearer_token(req.request()).and_then(|token| {
        verify_token(token, &config.jwt_secret)
            .map_err(|e| AppError::Unauthorized(format!("Invalid or expired token: {e}")))
    });

    let claims = match verified {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %req.path(), error = %e, "Rejected unauthenticated request");
            let resp = e.error_response();
            return Ok(req.into_response(resp));
        }
    };

    let user = AuthUser {
        user_id: claims.user_id,
        email: claims.sub,
        role: claims.role,
    };
    debug!(user_id = user.user_id, email = %user.email, role = %user.role, "Authenticated request");
    req.extensions_mut().insert(user);

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::jwt::generate_access_token, model::role::Role};
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test as atest, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.user_id.to_string())
    }

    #[actix_web::test]
    async fn protected_scope_requires_a_valid_token() {
        let config = Config::for_tests();
        let token = generate_access_token(
            42,
            "u@company.com".to_string(),
            Role::Employee,
            &config.jwt_secret,
            60,
        )
        .unwrap();

        let app = atest::init_service(
            App::new().app_data(Data::new(config)).service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = atest::TestRequest::get().uri("/api/me").to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = atest::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let resp = atest::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = atest::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = atest::call_and_read_body(&app, req).await;
        assert_eq!(body, "42");
    }
}
