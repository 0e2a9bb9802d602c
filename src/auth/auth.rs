use crate::{model::role::Role, models::Claims};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Caller identity, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// `None` when the role id is unknown.
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role: Role::from_id(claims.role)?,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.manages_attendance() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// The employee profile behind this login, required for self check-in.
    pub fn require_employee(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| actix_web::error::ErrorForbidden("No employee profile"))
    }

    /// Whose attendance a query may read: employees only their own, HR/Admin anyone.
    pub fn resolve_employee(&self, requested: Option<u64>) -> actix_web::Result<u64> {
        match requested {
            Some(id) if self.role.manages_attendance() || self.employee_id == Some(id) => Ok(id),
            Some(_) => Err(actix_web::error::ErrorForbidden(
                "You can only view your own attendance",
            )),
            None => self.employee_id.ok_or_else(|| {
                actix_web::error::ErrorBadRequest("employee_id is required")
            }),
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "tester".to_string(),
            role,
            employee_id,
        }
    }

    #[test]
    fn employees_only_see_themselves() {
        let emp = user(Role::Employee, Some(7));
        assert_eq!(emp.resolve_employee(None).unwrap(), 7);
        assert_eq!(emp.resolve_employee(Some(7)).unwrap(), 7);
        assert!(emp.resolve_employee(Some(8)).is_err());
    }

    #[test]
    fn hr_can_read_anyone_but_needs_an_id_without_a_profile() {
        let hr = user(Role::Hr, None);
        assert_eq!(hr.resolve_employee(Some(8)).unwrap(), 8);
        assert!(hr.resolve_employee(None).is_err());
        assert!(hr.require_hr_or_admin().is_ok());
        assert!(hr.require_employee().is_err());
    }

    #[test]
    fn unknown_role_ids_are_rejected() {
        let claims = Claims {
            user_id: 1,
            sub: "x".to_string(),
            role: 42,
            exp: 0,
            jti: String::new(),
            token_type: crate::models::TokenType::Access,
            employee_id: None,
        };
        assert!(AuthUser::from_claims(claims).is_none());
    }

    #[actix_web::test]
    async fn extractor_reads_the_user_left_by_the_middleware() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        assert!(AuthUser::extract(&req).await.is_err());

        req.extensions_mut().insert(user(Role::Employee, Some(7)));
        let extracted = AuthUser::extract(&req).await.unwrap();
        assert_eq!(extracted.employee_id, Some(7));
        assert_eq!(extracted.username, "tester");
    }
}
