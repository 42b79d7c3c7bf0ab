use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement,
};

use super::StoreError;
use crate::entity::{chat, status};

/// Latest active message per counterpart. The counterpart is computed by one
/// CASE expression per row so direction of storage does not matter.
const LATEST_PER_COUNTERPART_SQL: &str = "\
SELECT c.* FROM t_chat c \
INNER JOIN ( \
    SELECT CASE WHEN sender_id = ? THEN receiver_id ELSE sender_id END AS friend_id, \
           MAX(created_datetime) AS latest_chat_datetime \
    FROM t_chat \
    WHERE (sender_id = ? OR receiver_id = ?) AND status_code = ? \
    GROUP BY friend_id \
) latest \
ON latest.friend_id = CASE WHEN c.sender_id = ? THEN c.receiver_id ELSE c.sender_id END \
AND latest.latest_chat_datetime = c.created_datetime \
WHERE (c.sender_id = ? OR c.receiver_id = ?) AND c.status_code = ? \
ORDER BY c.created_datetime DESC, c.id DESC";

/// Stores a new active message. The receiver is not checked here.
pub async fn send(
    db: &DatabaseConnection,
    sender_id: i32,
    receiver_id: i32,
    message: &str,
) -> Result<chat::Model, StoreError> {
    send_at(db, sender_id, receiver_id, message, Utc::now()).await
}

pub(crate) async fn send_at(
    db: &DatabaseConnection,
    sender_id: i32,
    receiver_id: i32,
    message: &str,
    created: DateTime<Utc>,
) -> Result<chat::Model, StoreError> {
    let model = chat::ActiveModel {
        sender_id: Set(sender_id),
        receiver_id: Set(receiver_id),
        message: Set(message.to_string()),
        created_datetime: Set(created),
        status_code: Set(status::ACTIVE),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Every active message between the two ids in either direction, newest first.
pub async fn get_thread(
    db: &DatabaseConnection,
    person_id: i32,
    friend_id: i32,
) -> Result<Vec<chat::Model>, StoreError> {
    let between = Condition::any()
        .add(
            Condition::all()
                .add(chat::Column::SenderId.eq(person_id))
                .add(chat::Column::ReceiverId.eq(friend_id)),
        )
        .add(
            Condition::all()
                .add(chat::Column::SenderId.eq(friend_id))
                .add(chat::Column::ReceiverId.eq(person_id)),
        );

    let chats = chat::Entity::find()
        .filter(between)
        .filter(chat::Column::StatusCode.eq(status::ACTIVE))
        .order_by_desc(chat::Column::CreatedDatetime)
        .order_by_desc(chat::Column::Id)
        .all(db)
        .await?;
    Ok(chats)
}

/// One row per counterpart: the most recent active message exchanged with
/// them. When several messages share the latest timestamp the highest id
/// wins. Rows come back newest first.
pub async fn get_conversation_summaries(
    db: &DatabaseConnection,
    person_id: i32,
) -> Result<Vec<chat::Model>, StoreError> {
    let values: Vec<sea_orm::Value> = vec![
        person_id.into(),
        person_id.into(),
        person_id.into(),
        status::ACTIVE.into(),
        person_id.into(),
        person_id.into(),
        person_id.into(),
        status::ACTIVE.into(),
    ];
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        LATEST_PER_COUNTERPART_SQL,
        values,
    );
    let mut chats = chat::Entity::find().from_raw_sql(stmt).all(db).await?;

    let mut seen = HashSet::new();
    chats.retain(|c| seen.insert(counterpart(c, person_id)));
    Ok(chats)
}

/// Only active messages are visible.
pub async fn get_by_id(
    db: &DatabaseConnection,
    chat_id: i32,
) -> Result<Option<chat::Model>, StoreError> {
    let chat = chat::Entity::find_by_id(chat_id)
        .filter(chat::Column::StatusCode.eq(status::ACTIVE))
        .one(db)
        .await?;
    Ok(chat)
}

/// Caller must have checked that the acting user is the sender.
pub async fn edit(
    db: &DatabaseConnection,
    chat: chat::Model,
    new_message: &str,
) -> Result<chat::Model, StoreError> {
    let mut active: chat::ActiveModel = chat.into();
    active.message = Set(new_message.to_string());
    Ok(active.update(db).await?)
}

pub async fn soft_delete(
    db: &DatabaseConnection,
    chat: chat::Model,
) -> Result<chat::Model, StoreError> {
    let mut active: chat::ActiveModel = chat.into();
    active.status_code = Set(status::DELETED);
    Ok(active.update(db).await?)
}

fn counterpart(chat: &chat::Model, person_id: i32) -> i32 {
    if chat.sender_id == person_id {
        chat.receiver_id
    } else {
        chat.sender_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use chrono::{Duration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn messages(chats: &[chat::Model]) -> Vec<&str> {
        chats.iter().map(|c| c.message.as_str()).collect()
    }

    #[actix_rt::test]
    async fn send_stores_active_message() {
        let db = test_db().await;
        let chat = send(&db, 1, 2, "hello").await.unwrap();
        assert_eq!(chat.sender_id, 1);
        assert_eq!(chat.receiver_id, 2);
        assert_eq!(chat.message, "hello");
        assert_eq!(chat.status_code, status::ACTIVE);

        let found = get_by_id(&db, chat.id).await.unwrap().unwrap();
        assert_eq!(found, chat);
    }

    #[actix_rt::test]
    async fn send_accepts_ids_without_user_rows() {
        use crate::entity::user;

        let db = test_db().await;
        assert!(user::Entity::find_by_id(2).one(&db).await.unwrap().is_none());

        let chat = send(&db, 1, 2, "hi").await.unwrap();
        assert_eq!(get_thread(&db, 2, 1).await.unwrap(), vec![chat.clone()]);
        let summaries = get_conversation_summaries(&db, 1).await.unwrap();
        assert_eq!(summaries, vec![chat]);
    }

    #[actix_rt::test]
    async fn thread_covers_both_directions_newest_first() {
        let db = test_db().await;
        send_at(&db, 1, 2, "a", at(0)).await.unwrap();
        send_at(&db, 2, 1, "b", at(10)).await.unwrap();
        send_at(&db, 1, 3, "other pair", at(20)).await.unwrap();
        send_at(&db, 3, 2, "not ours", at(30)).await.unwrap();
        send_at(&db, 1, 2, "c", at(40)).await.unwrap();

        let thread = get_thread(&db, 1, 2).await.unwrap();
        assert_eq!(messages(&thread), vec!["c", "b", "a"]);

        let mirrored = get_thread(&db, 2, 1).await.unwrap();
        assert_eq!(messages(&mirrored), vec!["c", "b", "a"]);
    }

    #[actix_rt::test]
    async fn thread_breaks_timestamp_ties_by_id() {
        let db = test_db().await;
        let first = send_at(&db, 1, 2, "first", at(5)).await.unwrap();
        let second = send_at(&db, 2, 1, "second", at(5)).await.unwrap();

        let thread = get_thread(&db, 1, 2).await.unwrap();
        let ids: Vec<i32> = thread.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[actix_rt::test]
    async fn summaries_pick_latest_message_per_counterpart() {
        let db = test_db().await;
        send(&db, 1, 2, "hi").await.unwrap();
        send(&db, 2, 1, "yo").await.unwrap();
        send(&db, 1, 3, "hey").await.unwrap();

        let summaries = get_conversation_summaries(&db, 1).await.unwrap();
        assert_eq!(summaries.len(), 2);
        let by_counterpart: Vec<(i32, &str)> = summaries
            .iter()
            .map(|c| (counterpart(c, 1), c.message.as_str()))
            .collect();
        assert!(by_counterpart.contains(&(2, "yo")));
        assert!(by_counterpart.contains(&(3, "hey")));
    }

    #[actix_rt::test]
    async fn summaries_match_max_timestamp_and_order_newest_first() {
        let db = test_db().await;
        send_at(&db, 4, 1, "old from 4", at(0)).await.unwrap();
        send_at(&db, 1, 2, "to 2", at(10)).await.unwrap();
        send_at(&db, 1, 4, "latest with 4", at(50)).await.unwrap();
        send_at(&db, 2, 1, "latest with 2", at(30)).await.unwrap();
        send_at(&db, 5, 6, "unrelated", at(99)).await.unwrap();

        let summaries = get_conversation_summaries(&db, 1).await.unwrap();
        assert_eq!(messages(&summaries), vec!["latest with 4", "latest with 2"]);
        assert_eq!(summaries[0].created_datetime, at(50));
        assert_eq!(summaries[1].created_datetime, at(30));

        let from_other_side = get_conversation_summaries(&db, 2).await.unwrap();
        assert_eq!(messages(&from_other_side), vec!["latest with 2"]);
    }

    #[actix_rt::test]
    async fn summaries_break_ties_by_highest_id() {
        let db = test_db().await;
        send_at(&db, 1, 2, "first", at(7)).await.unwrap();
        let later = send_at(&db, 2, 1, "second", at(7)).await.unwrap();

        let summaries = get_conversation_summaries(&db, 1).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, later.id);
    }

    #[actix_rt::test]
    async fn edit_changes_text_in_place() {
        let db = test_db().await;
        let chat = send(&db, 1, 2, "typo").await.unwrap();
        let edited = edit(&db, chat.clone(), "fixed").await.unwrap();
        assert_eq!(edited.id, chat.id);
        assert_eq!(edited.message, "fixed");
        assert_eq!(edited.created_datetime, chat.created_datetime);
        let found = get_by_id(&db, chat.id).await.unwrap().unwrap();
        assert_eq!(found.message, "fixed");
    }

    #[actix_rt::test]
    async fn soft_deleted_chat_disappears_from_every_read() {
        let db = test_db().await;
        send_at(&db, 1, 2, "kept", at(0)).await.unwrap();
        let doomed = send_at(&db, 2, 1, "doomed", at(10)).await.unwrap();

        let deleted = soft_delete(&db, doomed.clone()).await.unwrap();
        assert_eq!(deleted.status_code, status::DELETED);

        assert!(get_by_id(&db, doomed.id).await.unwrap().is_none());
        for (a, b) in [(1, 2), (2, 1)] {
            let thread = get_thread(&db, a, b).await.unwrap();
            assert_eq!(messages(&thread), vec!["kept"]);
            let summaries = get_conversation_summaries(&db, a).await.unwrap();
            assert_eq!(messages(&summaries), vec!["kept"]);
        }
    }

    #[actix_rt::test]
    async fn summaries_drop_counterpart_with_only_deleted_messages() {
        let db = test_db().await;
        let only = send(&db, 1, 9, "gone").await.unwrap();
        soft_delete(&db, only).await.unwrap();
        assert!(get_conversation_summaries(&db, 1).await.unwrap().is_empty());
        assert!(get_conversation_summaries(&db, 9).await.unwrap().is_empty());
    }
}
