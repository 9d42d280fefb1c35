use log::info;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement};
use std::fs;
use std::path::Path;

use crate::config::AppConfig;

const SQLITE_SCHEMA: &str = include_str!("../schema-sqlite.sql");

pub async fn connect_db(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    ensure_sqlite_dir(config);
    let db = Database::connect(config.database_url()).await?;
    init_schema(&db).await?;
    Ok(db)
}

fn ensure_sqlite_dir(config: &AppConfig) {
    if config.database_url.is_some() {
        return;
    }
    let path = Path::new(config.sqlite_path.trim());
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
}

/// Creates the tables on an empty SQLite database. Other backends are
/// expected to be migrated out of band.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    if backend != DbBackend::Sqlite {
        return Ok(());
    }
    let exists_stmt = Statement::from_string(
        backend,
        "SELECT name FROM sqlite_master WHERE type='table' AND name='t_user' LIMIT 1",
    );
    if db.query_one(exists_stmt).await?.is_some() {
        return Ok(());
    }

    for stmt in split_sql(SQLITE_SCHEMA) {
        db.execute(Statement::from_string(backend, stmt)).await?;
    }
    info!("sqlite schema initialized");
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sql_skips_comments_and_blank_statements() {
        let sql = "-- users\nCREATE TABLE a (id INTEGER);\n\nCREATE TABLE b (id INTEGER);\n;";
        let stmts = split_sql(sql);
        assert_eq!(stmts, vec!["CREATE TABLE a (id INTEGER)", "CREATE TABLE b (id INTEGER)"]);
    }

    #[test]
    fn schema_declares_every_table() {
        let stmts = split_sql(SQLITE_SCHEMA).join("\n");
        for table in ["t_user", "t_follower", "t_post", "t_session"] {
            assert!(stmts.contains(&format!("CREATE TABLE {}", table)), "missing {}", table);
        }
    }
}
