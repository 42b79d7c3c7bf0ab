use actix_web::{http::StatusCode, ResponseError};
use log::error;
use thiserror::Error;

use crate::response::response_from_error;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    Biz { code: i32, msg: String },
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::Biz { code: 1, msg: msg.into() }
    }

    pub fn need_login() -> Self {
        Self::Biz { code: 3, msg: "Request needs user to be authenticated".to_string() }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Biz { code: 4, msg: msg.into() }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::Biz { code: 5, msg: msg.into() }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Biz { code: 6, msg: msg.into() }
    }

    pub fn gone(msg: impl Into<String>) -> Self {
        Self::Biz { code: 7, msg: msg.into() }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Biz { code: 3, msg: msg.into() }
    }

    pub fn system_exception() -> Self {
        Self::Biz { code: 99, msg: "system_exception".to_string() }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Biz { code, .. } => *code,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            Self::Biz { msg, .. } => msg,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!("store operation failed: {}", err);
        AppError::system_exception()
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            1 => StatusCode::BAD_REQUEST,
            3 => StatusCode::UNAUTHORIZED,
            4 => StatusCode::FORBIDDEN,
            5 => StatusCode::NOT_FOUND,
            6 => StatusCode::CONFLICT,
            7 => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(AppError::param_error("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::need_login().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::gone("x").status_code(), StatusCode::GONE);
        assert_eq!(
            AppError::system_exception().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
