use actix_web::{web, HttpResponse};
use log::{error, info};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use super::user::{to_user_dto, UserDto};
use super::{non_blank, validate_contact};
use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::entity::{status, user};
use crate::error::AppError;
use crate::otp::{self, OtpPurpose};
use crate::response::{Detail, ResponseDto};
use crate::security::{decode_token, issue_token, verify_password, TokenPurpose};
use crate::store::user::{self as user_store, NewUser, UserPatch};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/token").route(web::post().to(create_access_token)))
        .service(web::resource("/signup").route(web::post().to(signup)))
        .service(web::resource("/verify-otp").route(web::post().to(verify_otp)))
        .service(web::resource("/resend-otp").route(web::post().to(resend_otp)))
        .service(web::resource("/forgot-password").route(web::post().to(forgot_password)))
        .service(web::resource("/reset-password").route(web::post().to(reset_password)));
}

#[derive(Deserialize)]
struct TokenForm {
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

#[derive(Deserialize)]
struct SignUpRequest {
    username: Option<String>,
    password: Option<String>,
    email: Option<String>,
    mobile_number: Option<String>,
}

#[derive(Serialize)]
struct SignUpResponse {
    access_token: String,
    token_type: &'static str,
    otp: u32,
}

#[derive(Deserialize)]
struct VerifyOtpQuery {
    otp: u32,
}

#[derive(Serialize)]
struct OtpResponse {
    otp: u32,
}

#[derive(Deserialize)]
struct ForgotPasswordForm {
    username: Option<String>,
    email: Option<String>,
    mobile_number: Option<String>,
}

#[derive(Serialize)]
struct ResetDelivery {
    detail: String,
    sent_to: Vec<String>,
}

#[derive(Deserialize)]
struct ResetPasswordQuery {
    token: String,
}

#[derive(Deserialize)]
struct ResetPasswordForm {
    password: Option<String>,
}

async fn create_access_token(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    form: web::Form<TokenForm>,
) -> Result<HttpResponse, AppError> {
    let username = non_blank(&form.username).ok_or_else(|| AppError::param_error("username cannot be null"))?;
    let password = form.password.clone().unwrap_or_default();
    if password.is_empty() {
        return Err(AppError::param_error("password cannot be null"));
    }

    let user = user_store::lookup(db.get_ref(), Some(username.as_str()), None, None)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !verify_password(&password, &user.hashed_password) {
        return Err(AppError::unauthorized("Incorrect Password"));
    }

    let response = TokenResponse {
        access_token: access_token(&config, user.id)?,
        token_type: "bearer",
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(response))))
}

async fn signup(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    payload: web::Json<SignUpRequest>,
) -> Result<HttpResponse, AppError> {
    let username = non_blank(&payload.username).ok_or_else(|| AppError::param_error("username cannot be null"))?;
    let password = payload.password.clone().unwrap_or_default();
    if password.trim().is_empty() {
        return Err(AppError::param_error("password cannot be null"));
    }
    let email = non_blank(&payload.email);
    let mobile_number = non_blank(&payload.mobile_number);
    if email.is_none() && mobile_number.is_none() {
        return Err(AppError::param_error("Either email or mobile number is mandatory"));
    }
    validate_contact(email.as_deref(), mobile_number.as_deref())?;

    let candidate = NewUser {
        username: Some(username.clone()),
        email: email.clone(),
        mobile_number: mobile_number.clone(),
        password,
        otp_key: Some(otp::new_key()),
    };

    let user = match user_store::create(db.get_ref(), candidate).await? {
        Some(user) => user,
        None => {
            return Err(
                duplicate_credential(db.get_ref(), &username, email.as_deref(), mobile_number.as_deref())
                    .await?,
            );
        }
    };

    let otp_key = user.otp_key.as_deref().ok_or_else(AppError::system_exception)?;
    let code = otp::generate(otp_key, user.id, OtpPurpose::SignUp, config.otp_interval_seconds);
    info!("signup user_id={} pending verification", user.id);

    let response = SignUpResponse {
        access_token: access_token(&config, user.id)?,
        token_type: "bearer",
        otp: code,
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(response))))
}

/// The insert collided; find out which identifier is already taken.
async fn duplicate_credential(
    db: &DatabaseConnection,
    username: &str,
    email: Option<&str>,
    mobile_number: Option<&str>,
) -> Result<AppError, AppError> {
    let existing = user_store::lookup(db, Some(username), email, mobile_number).await?;
    let Some(existing) = existing else {
        return Ok(AppError::conflict("Credentials already exist"));
    };

    let candidates = [
        ("Username", existing.username.as_deref(), Some(username)),
        ("E-mail", existing.email.as_deref(), email),
        ("Mobile Number", existing.mobile_number.as_deref(), mobile_number),
    ];
    for (label, stored, requested) in candidates {
        if let (Some(stored), Some(requested)) = (stored, requested) {
            if stored == requested {
                return Ok(AppError::conflict(format!("{}: {} already exists", label, stored)));
            }
        }
    }
    Ok(AppError::conflict("Credentials already exist"))
}

async fn verify_otp(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    current: CurrentUser,
    query: web::Query<VerifyOtpQuery>,
) -> Result<HttpResponse, AppError> {
    let user = current.0;
    ensure_pending(&user)?;
    let otp_key = user.otp_key.as_deref().ok_or_else(AppError::system_exception)?;
    if !otp::verify(otp_key, OtpPurpose::SignUp, query.otp, config.otp_interval_seconds) {
        return Err(AppError::param_error("Invalid or expired OTP"));
    }

    let user = user_store::activate(db.get_ref(), user).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::<UserDto>::success(Some(to_user_dto(user)))))
}

async fn resend_otp(
    config: web::Data<AppConfig>,
    current: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let user = current.0;
    ensure_pending(&user)?;
    let otp_key = user.otp_key.as_deref().ok_or_else(AppError::system_exception)?;
    let code = otp::generate(otp_key, user.id, OtpPurpose::SignUp, config.otp_interval_seconds);
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(OtpResponse { otp: code }))))
}

fn ensure_pending(user: &user::Model) -> Result<(), AppError> {
    match user.status_code {
        status::ACTIVE => Err(AppError::conflict("User already active")),
        status::DELETED => Err(AppError::not_found("Account not found")),
        _ => Ok(()),
    }
}

async fn forgot_password(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    form: web::Form<ForgotPasswordForm>,
) -> Result<HttpResponse, AppError> {
    let username = non_blank(&form.username);
    let email = non_blank(&form.email);
    let mobile_number = non_blank(&form.mobile_number);
    if username.is_none() && email.is_none() && mobile_number.is_none() {
        return Err(AppError::param_error(
            "Either username or email or mobile number is mandatory",
        ));
    }

    let user = user_store::lookup(
        db.get_ref(),
        username.as_deref(),
        email.as_deref(),
        mobile_number.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;

    let token = issue_token(&config, user.id, TokenPurpose::Reset).map_err(|e| {
        error!("reset token issue failed: {}", e);
        AppError::system_exception()
    })?;

    // delivery is stubbed; the link only reaches the log
    let sent_to: Vec<String> = [user.email, user.mobile_number].into_iter().flatten().collect();
    info!(
        "password reset user_id={} sent to {:?} link=/reset-password?token={}",
        user.id, sent_to, token
    );

    let response = ResetDelivery {
        detail: "Password reset link sent".to_string(),
        sent_to,
    };
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(response))))
}

async fn reset_password(
    db: web::Data<DatabaseConnection>,
    config: web::Data<AppConfig>,
    query: web::Query<ResetPasswordQuery>,
    form: web::Form<ResetPasswordForm>,
) -> Result<HttpResponse, AppError> {
    let password = form.password.clone().unwrap_or_default();
    if password.trim().is_empty() {
        return Err(AppError::param_error("password cannot be null"));
    }

    let user_id = decode_token(&config, &query.token, TokenPurpose::Reset)
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let user = user_store::get_by_id(db.get_ref(), user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if user.status_code == status::DELETED {
        return Err(AppError::gone("Account deleted"));
    }

    let patch = UserPatch {
        password: Some(password),
        ..Default::default()
    };
    user_store::update(db.get_ref(), user.id, patch)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(Detail::new("Password Reset Successful")))))
}

fn access_token(config: &AppConfig, user_id: i32) -> Result<String, AppError> {
    issue_token(config, user_id, TokenPurpose::Access).map_err(|e| {
        error!("access token issue failed: {}", e);
        AppError::system_exception()
    })
}
