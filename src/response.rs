use actix_web::{
    error::{JsonPayloadError, QueryPayloadError, UrlencodedError},
    HttpRequest, HttpResponse, ResponseError,
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
pub struct ResponseDto<T: Serialize> {
    pub data: Option<T>,
    pub code: i32,
    pub msg: String,
}

impl<T: Serialize> ResponseDto<T> {
    pub fn success(data: Option<T>) -> Self {
        Self {
            data,
            code: 0,
            msg: "".to_string(),
        }
    }
}

/// Body for endpoints that only acknowledge an action.
#[derive(Serialize)]
pub struct Detail {
    pub detail: String,
}

impl Detail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let app_err = match err {
        JsonPayloadError::ContentType => AppError::param_error("Content-Type must be application/json"),
        JsonPayloadError::Deserialize(e) => AppError::param_error(format!("Invalid request body: {}", e)),
        _ => AppError::param_error("Invalid request body"),
    };
    app_err.into()
}

pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    AppError::param_error(format!("Invalid form data: {}", err)).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::param_error(format!("Invalid query string: {}", err)).into()
}

pub fn response_from_error(err: &AppError) -> HttpResponse {
    HttpResponse::build(err.status_code()).json(ResponseDto::<()> {
        data: None,
        code: err.code(),
        msg: err.msg().to_string(),
    })
}
