use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub sqlite_path: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_header: String,
    pub session_ttl_minutes: i64,
    pub remember_ttl_days: i64,
    pub reset_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub app_url: String,
    pub mail_from: String,
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
    pub cors_allow_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let server_port = parse_env("SERVER_PORT", 38321);

        let sqlite_path = env::var("SQLITE_PATH").unwrap_or_else(|_| "/opt/weibo/data.sqlite".to_string());
        let database_url = non_empty_env("DATABASE_URL");

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "hV3q9mTzK2xWbR7uYe4N".to_string());
        let token_header = env::var("TOKEN_HEADER").unwrap_or_else(|_| "token".to_string());

        let app_url = env::var("APP_URL").unwrap_or_else(|_| format!("http://localhost:{}", server_port));
        let mail_from = env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@weibo.local".to_string());

        Self {
            server_port,
            sqlite_path,
            database_url,
            jwt_secret,
            token_header,
            session_ttl_minutes: parse_env("SESSION_TTL_MINUTES", 120),
            remember_ttl_days: parse_env("REMEMBER_TTL_DAYS", 1825),
            reset_ttl_minutes: parse_env("RESET_TTL_MINUTES", 60),
            bcrypt_cost: parse_env("BCRYPT_COST", bcrypt::DEFAULT_COST),
            app_url: app_url.trim_end_matches('/').to_string(),
            mail_from,
            mail_api_url: non_empty_env("MAIL_API_URL"),
            mail_api_token: non_empty_env("MAIL_API_TOKEN"),
            cors_allow_origin: env::var("CORS_ALLOW_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        }
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        let path = self.sqlite_path.trim();
        if path.starts_with("sqlite:") || path.starts_with("file:") {
            return path.to_string();
        }
        format!("sqlite://{}?mode=rwc", path)
    }

    /// Link the activation mail points at.
    pub fn activation_url(&self, token: &str) -> String {
        format!("{}/signup/confirm/{}", self.app_url, token)
    }

    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/password/reset/{}", self.app_url, token)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            server_port: 0,
            sqlite_path: ":memory:".to_string(),
            database_url: Some("sqlite::memory:".to_string()),
            jwt_secret: "test-secret".to_string(),
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
}
