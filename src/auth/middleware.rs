use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_access_token;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

fn unauthorized(req: ServiceRequest, body: serde_json::Value) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(body);
    req.into_response(resp.map_into_boxed_body())
}

/// Verifies the bearer token and stores the caller as an [`AuthUser`] extension.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding"}),
            )
        })?,
        None => {
            return Ok(unauthorized(
                req,
                json!({"error": "Missing Authorization header"}),
            ));
        }
    };

    let claims = match header_value.strip_prefix("Bearer ") {
        Some(token) => verify_access_token(token, &config.jwt_secret),
        None => {
            return Ok(unauthorized(
                req,
                json!({"error": "Authorization header must start with Bearer"}),
            ));
        }
    };

    let claims = match claims {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            return Ok(unauthorized(
                req,
                json!({"error": "Invalid or expired token", "details": e}),
            ));
        }
    };

    let Some(auth_user) = AuthUser::from_claims(claims) else {
        return Ok(unauthorized(req, json!({"error": "Invalid role"})));
    };

    debug!(
        user_id = auth_user.user_id,
        username = %auth_user.username,
        role = ?auth_user.role,
        "Authenticated request"
    );
    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
