use log::{debug, warn};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use std::fs;
use std::path::Path;

use crate::config::AppConfig;

pub async fn connect_db(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let url = config.database_url();
    ensure_sqlite_dir(&url);
    let db = Database::connect(&url).await?;
    init_schema(&db).await?;
    Ok(db)
}

fn ensure_sqlite_dir(url: &str) {
    let Some(path) = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
    else {
        return;
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(':') {
        return;
    }
    if let Some(parent) = Path::new(path).parent() {
        let _ = fs::create_dir_all(parent);
    }
}

const SQLITE_SCHEMA: &str = include_str!("../schema-sqlite.sql");
const MYSQL_SCHEMA: &str = include_str!("../schema-mysql.sql");

/// Table-existence query and bootstrap script for a backend.
fn schema_for(backend: DatabaseBackend) -> Option<(&'static str, &'static str)> {
    match backend {
        DatabaseBackend::Sqlite => Some((
            "SELECT name FROM sqlite_master WHERE type='table' AND name='t_chat' LIMIT 1",
            SQLITE_SCHEMA,
        )),
        DatabaseBackend::MySql => Some((
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = 't_chat' LIMIT 1",
            MYSQL_SCHEMA,
        )),
        _ => None,
    }
}

async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let Some((exists_sql, sql)) = schema_for(backend) else {
        warn!("no bundled schema for {:?}", backend);
        return Ok(());
    };
    if db.query_one(Statement::from_string(backend, exists_sql)).await?.is_some() {
        return Ok(());
    }

    for stmt in split_sql(sql) {
        debug!("schema: {}", stmt.lines().next().unwrap_or_default());
        if let Err(e) = db.execute(Statement::from_string(backend, stmt)).await {
            warn!("schema statement failed: {}", e);
        }
    }
    Ok(())
}

fn split_sql(input: &str) -> Vec<String> {
    let mut buf = String::new();
    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") || trimmed.is_empty() {
            continue;
        }
        buf.push_str(line);
        buf.push('\n');
    }
    buf.split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Fresh in-memory database. A single pooled connection keeps every query on
/// the same SQLite memory instance.
#[cfg(test)]
pub async fn test_db() -> DatabaseConnection {
    let mut opts = sea_orm::ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opts).await.expect("connect in-memory sqlite");
    init_schema(&db).await.expect("bootstrap schema");
    db
}
