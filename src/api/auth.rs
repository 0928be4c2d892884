// Bearer-token extractors for API handlers

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::api::server::AppState;
use crate::error::AppError;
use crate::model::User;

/// Token from `Authorization: Bearer <token>`, if present.
pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn app_state(req: &HttpRequest) -> Result<web::Data<AppState>, AppError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("application state not configured")))
}

/// The authenticated caller. Rejects the request with 401 when the token is
/// missing, invalid, expired, or names a user that no longer exists.
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state?;
            let token = token
                .ok_or_else(|| AppError::Unauthorized("Missing authentication token".into()))?;
            let user = state
                .identity
                .authenticate(state.store.as_ref(), &token)
                .await?;
            Ok(CurrentUser(user))
        })
    }
}

/// The caller if a valid token was supplied; never rejects the request.
pub struct MaybeUser(pub Option<User>);

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = app_state(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state?;
            let user = state
                .identity
                .authenticate_optional(state.store.as_ref(), token.as_deref())
                .await;
            Ok(MaybeUser(user))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn extracts_bearer_tokens_only() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def"))
            .to_http_request();
        assert_eq!(bearer_token(&req).as_deref(), Some("abc.def"));

        let basic = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic Zm9vOmJhcg=="))
            .to_http_request();
        assert!(bearer_token(&basic).is_none());

        let empty = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert!(bearer_token(&empty).is_none());

        assert!(bearer_token(&TestRequest::default().to_http_request()).is_none());
    }
}
