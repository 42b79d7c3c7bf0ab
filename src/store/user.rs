use chrono::Utc;
use log::{debug, info};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionError, TransactionTrait,
};

use super::{is_unique_violation, StoreError};
use crate::entity::{chat, comment, image, post, post_like, profile, status, user};
use crate::security::hash_password;

/// Signup candidate. `password` is plaintext and gets hashed on insert.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub password: String,
    pub otp_key: Option<String>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub password: Option<String>,
}

/// First non-deleted user matching any of the supplied identifiers.
pub async fn lookup(
    db: &DatabaseConnection,
    username: Option<&str>,
    email: Option<&str>,
    mobile_number: Option<&str>,
) -> Result<Option<user::Model>, StoreError> {
    let mut any = Condition::any();
    let mut has_identifier = false;
    if let Some(v) = username {
        any = any.add(user::Column::Username.eq(v));
        has_identifier = true;
    }
    if let Some(v) = email {
        any = any.add(user::Column::Email.eq(v));
        has_identifier = true;
    }
    if let Some(v) = mobile_number {
        any = any.add(user::Column::MobileNumber.eq(v));
        has_identifier = true;
    }
    if !has_identifier {
        return Ok(None);
    }

    let found = user::Entity::find()
        .filter(any)
        .filter(user::Column::StatusCode.ne(status::DELETED))
        .order_by_asc(user::Column::Id)
        .one(db)
        .await?;
    Ok(found)
}

/// Any status, deleted included.
pub async fn get_by_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Option<user::Model>, StoreError> {
    Ok(user::Entity::find_by_id(user_id).one(db).await?)
}

/// Inserts a pending account. A collision on username, email or mobile
/// number rolls the insert back and yields `None`; use [`lookup`] to find out
/// which identifier was taken.
pub async fn create(
    db: &DatabaseConnection,
    candidate: NewUser,
) -> Result<Option<user::Model>, StoreError> {
    let hashed_password = hash_password(&candidate.password)?;
    let now = Utc::now();
    let model = user::ActiveModel {
        username: Set(candidate.username),
        email: Set(candidate.email),
        mobile_number: Set(candidate.mobile_number),
        hashed_password: Set(hashed_password),
        otp_key: Set(candidate.otp_key),
        status_code: Set(status::PENDING),
        created: Set(Some(now)),
        updated: Set(Some(now)),
        ..Default::default()
    };

    let txn = db.begin().await?;
    match model.insert(&txn).await {
        Ok(created) => {
            txn.commit().await?;
            info!("user created id={}", created.id);
            Ok(Some(created))
        }
        Err(err) if is_unique_violation(&err) => {
            txn.rollback().await?;
            debug!("user insert rejected: {}", err);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Applies the fields present in `patch`. Returns `None` when the user does
/// not exist or the change would collide with another account; the row is
/// left untouched in both cases.
pub async fn update(
    db: &DatabaseConnection,
    user_id: i32,
    patch: UserPatch,
) -> Result<Option<user::Model>, StoreError> {
    let hashed_password = match patch.password.as_deref().filter(|p| !p.is_empty()) {
        Some(plain) => Some(hash_password(plain)?),
        None => None,
    };

    let txn = db.begin().await?;
    let Some(existing) = user::Entity::find_by_id(user_id).one(&txn).await? else {
        txn.rollback().await?;
        return Ok(None);
    };

    let mut active: user::ActiveModel = existing.into();
    if let Some(v) = patch.username {
        active.username = Set(Some(v));
    }
    if let Some(v) = patch.email {
        active.email = Set(Some(v));
    }
    if let Some(v) = patch.mobile_number {
        active.mobile_number = Set(Some(v));
    }
    if let Some(hashed) = hashed_password {
        active.hashed_password = Set(hashed);
    }
    active.updated = Set(Some(Utc::now()));

    match active.update(&txn).await {
        Ok(updated) => {
            txn.commit().await?;
            Ok(Some(updated))
        }
        Err(err) if is_unique_violation(&err) => {
            txn.rollback().await?;
            debug!("user update rejected id={}: {}", user_id, err);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

/// Pending → active once the signup code checks out.
pub async fn activate(
    db: &DatabaseConnection,
    user: user::Model,
) -> Result<user::Model, StoreError> {
    let mut active: user::ActiveModel = user.into();
    active.status_code = Set(status::ACTIVE);
    active.updated = Set(Some(Utc::now()));
    let activated = active.update(db).await?;
    info!("user activated id={}", activated.id);
    Ok(activated)
}

/// Marks the account and everything it owns as deleted in one transaction:
/// profile, posts, images on those posts, comments and sent chats. Likes are
/// removed outright.
pub async fn soft_delete(db: &DatabaseConnection, user: &user::Model) -> Result<(), StoreError> {
    let user_id = user.id;
    db.transaction::<_, (), DbErr>(|txn| {
        Box::pin(async move {
            user::Entity::update_many()
                .col_expr(user::Column::StatusCode, Expr::value(status::DELETED))
                .col_expr(user::Column::Updated, Expr::value(Utc::now()))
                .filter(user::Column::Id.eq(user_id))
                .exec(txn)
                .await?;
            profile::Entity::update_many()
                .col_expr(profile::Column::StatusCode, Expr::value(status::DELETED))
                .filter(profile::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            post::Entity::update_many()
                .col_expr(post::Column::StatusCode, Expr::value(status::DELETED))
                .filter(post::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            image::Entity::update_many()
                .col_expr(image::Column::StatusCode, Expr::value(status::DELETED))
                .filter(
                    image::Column::PostId.in_subquery(
                        Query::select()
                            .column(post::Column::Id)
                            .from(post::Entity)
                            .and_where(post::Column::UserId.eq(user_id))
                            .to_owned(),
                    ),
                )
                .exec(txn)
                .await?;
            post_like::Entity::delete_many()
                .filter(post_like::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            comment::Entity::update_many()
                .col_expr(comment::Column::StatusCode, Expr::value(status::DELETED))
                .filter(comment::Column::UserId.eq(user_id))
                .exec(txn)
                .await?;
            chat::Entity::update_many()
                .col_expr(chat::Column::StatusCode, Expr::value(status::DELETED))
                .filter(chat::Column::SenderId.eq(user_id))
                .exec(txn)
                .await?;
            Ok(())
        })
    })
    .await
    .map_err(|err| match err {
        TransactionError::Connection(e) => e,
        TransactionError::Transaction(e) => e,
    })?;

    info!("user soft-deleted id={}", user_id);
    Ok(())
}
