pub mod chat;
pub mod comment;
pub mod image;
pub mod post;
pub mod post_like;
pub mod profile;
pub mod user;

/// Row lifecycle flag shared by every table.
pub mod status {
    pub const PENDING: i32 = 0;
    pub const ACTIVE: i32 = 1;
    pub const DELETED: i32 = -1;
}
