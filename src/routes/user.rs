use actix_web::{web, HttpResponse};
use chrono::SecondsFormat;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::{non_blank, validate_contact};
use crate::auth::{ActiveUser, CurrentUser};
use crate::entity::{status, user};
use crate::error::AppError;
use crate::response::{Detail, ResponseDto};
use crate::store::user::{self as user_store, UserPatch};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::patch().to(update_user))
            .route(web::delete().to(delete_user)),
    )
    .service(
        web::resource("/")
            .route(web::patch().to(update_user))
            .route(web::delete().to(delete_user)),
    )
    .service(web::resource("/me").route(web::get().to(current_user)));
}

#[derive(Deserialize)]
struct UpdateUserRequest {
    username: Option<String>,
    email: Option<String>,
    mobile_number: Option<String>,
    password: Option<String>,
}

/// Public view of an account; the password hash and OTP key never leave the
/// server.
#[derive(Serialize)]
pub(crate) struct UserDto {
    id: i32,
    username: Option<String>,
    email: Option<String>,
    mobile_number: Option<String>,
    status_code: i32,
    created: Option<String>,
}

pub(crate) fn to_user_dto(model: user::Model) -> UserDto {
    UserDto {
        id: model.id,
        username: model.username,
        email: model.email,
        mobile_number: model.mobile_number,
        status_code: model.status_code,
        created: model
            .created
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, false)),
    }
}

async fn current_user(auth: ActiveUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(to_user_dto(auth.0)))))
}

async fn update_user(
    db: web::Data<DatabaseConnection>,
    auth: ActiveUser,
    payload: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let patch = UserPatch {
        username: non_blank(&payload.username),
        email: non_blank(&payload.email),
        mobile_number: non_blank(&payload.mobile_number),
        password: payload.password.clone().filter(|p| !p.trim().is_empty()),
    };
    validate_contact(patch.email.as_deref(), patch.mobile_number.as_deref())?;

    user_store::update(db.get_ref(), auth.0.id, patch)
        .await?
        .ok_or_else(|| AppError::conflict("Credentials already exist"))?;

    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(Detail::new("user updated")))))
}

async fn delete_user(
    db: web::Data<DatabaseConnection>,
    auth: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let user = auth.0;
    if user.status_code == status::DELETED {
        return Err(AppError::gone("Account already deleted"));
    }
    user_store::soft_delete(db.get_ref(), &user).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(Detail::new("User deleted")))))
}
