//! Persistence for chats and accounts. Expected conditions (missing rows,
//! identifier collisions) come back as `Ok(None)`; `StoreError` is reserved
//! for failures the request cannot recover from.

pub mod chat;
pub mod user;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
