pub mod chat;
pub mod cors;
pub mod login;
pub mod user;

use actix_web::web;
use regex::Regex;

use crate::error::AppError;
use crate::response::{form_error_handler, json_error_handler, query_error_handler};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::FormConfig::default().error_handler(form_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .configure(login::config)
        .service(web::scope("/users").configure(user::config))
        .service(web::scope("/chats").configure(chat::config));
}

/// Trimmed value, with blank strings treated as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn validate_contact(email: Option<&str>, mobile_number: Option<&str>) -> Result<(), AppError> {
    if let Some(email) = email {
        let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_err(|_| AppError::system_exception())?;
        if !re.is_match(email) {
            return Err(AppError::param_error("Invalid e-mail address"));
        }
    }
    if let Some(mobile) = mobile_number {
        let re = Regex::new(r"^\+?[0-9]{7,15}$").map_err(|_| AppError::system_exception())?;
        if !re.is_match(mobile) {
            return Err(AppError::param_error("Invalid mobile number"));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use sea_orm::DatabaseConnection;

    use crate::config::AppConfig;
    use crate::entity::user;
    use crate::security::{issue_token, TokenPurpose};
    use crate::store::user::{self as user_store, NewUser};

    /// Builds the full service over an in-memory database.
    macro_rules! init_app {
        ($db:expr, $config:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data(actix_web::web::Data::new($config.clone()))
                    .app_data(actix_web::web::Data::new($db.clone()))
                    .configure(crate::routes::configure),
            )
            .await
        };
    }
    pub(crate) use init_app;

    pub(crate) async fn pending_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user_store::create(
            db,
            NewUser {
                username: Some(username.to_string()),
                email: Some(format!("{}@example.com", username)),
                mobile_number: None,
                password: "secret".to_string(),
                otp_key: Some(crate::otp::new_key()),
            },
        )
        .await
        .unwrap()
        .unwrap()
    }

    pub(crate) async fn active_user(db: &DatabaseConnection, username: &str) -> user::Model {
        let user = pending_user(db, username).await;
        user_store::activate(db, user).await.unwrap()
    }

    pub(crate) fn bearer(config: &AppConfig, user: &user::Model) -> (&'static str, String) {
        let token = issue_token(config, user.id, TokenPurpose::Access).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_blank_trims_and_drops_empty() {
        assert_eq!(non_blank(&Some("  bob ".to_string())), Some("bob".to_string()));
        assert_eq!(non_blank(&Some("   ".to_string())), None);
        assert_eq!(non_blank(&None), None);
    }

    #[test]
    fn contact_formats() {
        assert!(validate_contact(Some("a@b.io"), Some("+15551234567")).is_ok());
        assert!(validate_contact(None, None).is_ok());
        assert!(validate_contact(Some("not-an-email"), None).is_err());
        assert!(validate_contact(None, Some("12ab")).is_err());
    }
}
