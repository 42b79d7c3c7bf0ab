use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::entity::{status, user};
use crate::error::AppError;
use crate::security::{decode_token, TokenPurpose};
use crate::store::user as user_store;

/// Caller resolved from the bearer token, whatever the account status.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

/// Caller whose account is verified and not deleted.
#[derive(Clone, Debug)]
pub struct ActiveUser(pub user::Model);

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let resolved = resolve(req);
        Box::pin(async move { Ok(CurrentUser(resolved.await?)) })
    }
}

impl FromRequest for ActiveUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let resolved = resolve(req);
        Box::pin(async move {
            let user = resolved.await?;
            match user.status_code {
                status::ACTIVE => Ok(ActiveUser(user)),
                status::DELETED => Err(AppError::not_found("Account not found").into()),
                _ => Err(AppError::forbidden("Account not verified").into()),
            }
        })
    }
}

fn resolve(req: &HttpRequest) -> LocalBoxFuture<'static, Result<user::Model, AppError>> {
    let db = match req.app_data::<web::Data<DatabaseConnection>>() {
        Some(db) => db.clone(),
        None => {
            return Box::pin(async { Err(AppError::system_exception()) });
        }
    };
    let config = match req.app_data::<web::Data<AppConfig>>() {
        Some(cfg) => cfg.clone(),
        None => {
            return Box::pin(async { Err(AppError::system_exception()) });
        }
    };
    let token = extract_token(req, &config);

    Box::pin(async move {
        let token = token.ok_or_else(AppError::need_login)?;
        authenticate_token(&db, &config, &token).await
    })
}

fn extract_token(req: &HttpRequest, config: &AppConfig) -> Option<String> {
    let header = config.token_header.as_str();
    req.headers()
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(strip_bearer)
        .filter(|v| !v.is_empty())
}

fn strip_bearer(value: &str) -> String {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim().to_string(),
        _ => value.to_string(),
    }
}

async fn authenticate_token(
    db: &DatabaseConnection,
    config: &AppConfig,
    token: &str,
) -> Result<user::Model, AppError> {
    let user_id = decode_token(config, token, TokenPurpose::Access).ok_or_else(AppError::need_login)?;
    user_store::get_by_id(db, user_id)
        .await?
        .ok_or_else(AppError::need_login)
}
