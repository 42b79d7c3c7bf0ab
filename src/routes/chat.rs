use actix_web::{web, HttpResponse};
use chrono::SecondsFormat;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::auth::ActiveUser;
use crate::entity::{chat, status};
use crate::error::AppError;
use crate::response::ResponseDto;
use crate::store::chat as chat_store;
use crate::store::user as user_store;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(read_chats))
            .route(web::post().to(create_chat)),
    )
    .service(
        web::resource("/")
            .route(web::get().to(read_chats))
            .route(web::post().to(create_chat)),
    )
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(read_chat))
            .route(web::patch().to(update_message))
            .route(web::delete().to(delete_message)),
    );
}

#[derive(Deserialize)]
struct CreateChatQuery {
    receiver_id: i32,
}

#[derive(Deserialize)]
struct MessageRequest {
    message: Option<String>,
}

#[derive(Serialize)]
struct ChatDto {
    id: i32,
    sender_id: i32,
    receiver_id: i32,
    message: String,
    created_datetime: String,
    status_code: i32,
}

async fn create_chat(
    db: web::Data<DatabaseConnection>,
    auth: ActiveUser,
    query: web::Query<CreateChatQuery>,
    payload: web::Json<MessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message = required_message(&payload)?;
    let receiver = user_store::get_by_id(db.get_ref(), query.receiver_id).await?;
    if receiver.map_or(true, |r| r.status_code == status::DELETED) {
        return Err(AppError::not_found("Receiver not found"));
    }

    let chat = chat_store::send(db.get_ref(), auth.0.id, query.receiver_id, &message).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(to_chat_dto(chat)))))
}

async fn read_chat(
    db: web::Data<DatabaseConnection>,
    auth: ActiveUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let chats = chat_store::get_thread(db.get_ref(), auth.0.id, *path).await?;
    let list: Vec<ChatDto> = chats.into_iter().map(to_chat_dto).collect();
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(list))))
}

async fn read_chats(
    db: web::Data<DatabaseConnection>,
    auth: ActiveUser,
) -> Result<HttpResponse, AppError> {
    let chats = chat_store::get_conversation_summaries(db.get_ref(), auth.0.id).await?;
    let list: Vec<ChatDto> = chats.into_iter().map(to_chat_dto).collect();
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(list))))
}

async fn update_message(
    db: web::Data<DatabaseConnection>,
    auth: ActiveUser,
    path: web::Path<i32>,
    payload: web::Json<MessageRequest>,
) -> Result<HttpResponse, AppError> {
    let message = required_message(&payload)?;
    let chat = owned_chat(db.get_ref(), *path, auth.0.id, "Can't update other's messages").await?;
    let chat = chat_store::edit(db.get_ref(), chat, &message).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(to_chat_dto(chat)))))
}

async fn delete_message(
    db: web::Data<DatabaseConnection>,
    auth: ActiveUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let chat = owned_chat(db.get_ref(), *path, auth.0.id, "Can't delete other's messages").await?;
    let chat = chat_store::soft_delete(db.get_ref(), chat).await?;
    Ok(HttpResponse::Ok().json(ResponseDto::success(Some(to_chat_dto(chat)))))
}

/// Only the sender may change a message.
async fn owned_chat(
    db: &DatabaseConnection,
    chat_id: i32,
    user_id: i32,
    forbidden_msg: &str,
) -> Result<chat::Model, AppError> {
    let chat = chat_store::get_by_id(db, chat_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;
    if chat.sender_id != user_id {
        return Err(AppError::forbidden(forbidden_msg));
    }
    Ok(chat)
}

fn required_message(payload: &MessageRequest) -> Result<String, AppError> {
    payload
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| AppError::param_error("message cannot be empty"))
}

fn to_chat_dto(model: chat::Model) -> ChatDto {
    ChatDto {
        id: model.id,
        sender_id: model.sender_id,
        receiver_id: model.receiver_id,
        message: model.message,
        created_datetime: model
            .created_datetime
            .to_rfc3339_opts(SecondsFormat::Millis, false),
        status_code: model.status_code,
    }
}
