#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tempfile::TempDir;

use weibo_backend::activation;
use weibo_backend::config::AppConfig;
use weibo_backend::entity::user;
use weibo_backend::error::AccountError;
use weibo_backend::mailer::{MailMessage, Mailer};
use weibo_backend::password;

pub const PASSWORD: &str = "secret123";

/// Fresh in-memory database with the real schema. One pooled connection
/// keeps every query on the same in-memory file.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect in-memory sqlite");
    weibo_backend::db::init_schema(&db).await.expect("init schema");
    db
}

/// SQLite file with a pool of several connections, so concurrent callers
/// really contend for the database. Keep the directory alive for the
/// duration of the test.
pub async fn setup_file_db(connections: u32) -> (TempDir, DatabaseConnection) {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("weibo.sqlite").display());
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(connections).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite file");
    weibo_backend::db::init_schema(&db).await.expect("init schema");
    (dir, db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server_port: 0,
        sqlite_path: ":memory:".to_string(),
        database_url: Some("sqlite::memory:".to_string()),
        jwt_secret: "integration-secret".to_string(),
        token_header: "token".to_string(),
        session_ttl_minutes: 120,
        remember_ttl_days: 1825,
        reset_ttl_minutes: 60,
        bcrypt_cost: 4,
        app_url: "http://weibo.test".to_string(),
        mail_from: "no-reply@weibo.test".to_string(),
        mail_api_url: None,
        mail_api_token: None,
        cors_allow_origin: "*".to_string(),
    }
}

/// Remembers every message instead of sending it; can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<MailMessage>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn messages(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), AccountError> {
        if self.fail {
            return Err(AccountError::MailDelivery("relay unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub async fn register(db: &DatabaseConnection, name: &str, email: &str) -> user::Model {
    let hash = password::hash(PASSWORD, 4).expect("hash password");
    activation::register_pending(db, name, email, hash)
        .await
        .expect("register pending user")
}

pub async fn register_active(db: &DatabaseConnection, name: &str, email: &str) -> user::Model {
    let pending = register(db, name, email).await;
    let token = pending.activation_token.clone().expect("pending token");
    activation::redeem_token(db, &token).await.expect("redeem token")
}
