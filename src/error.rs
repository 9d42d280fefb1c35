use actix_web::{http::StatusCode, ResponseError};
use log::error;
use sea_orm::{DbErr, TransactionError};
use thiserror::Error;

use crate::response::response_from_error;

/// Failures of the account, session and social-graph operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("email has already been taken")]
    DuplicateEmail,
    #[error("token is invalid or has already been used")]
    TokenNotFound,
    #[error("token has expired")]
    TokenExpired,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account not activated")]
    AccountNotActivated,
    #[error("forbidden")]
    Forbidden,
    #[error("entropy source unavailable")]
    EntropyUnavailable,
    #[error("user not found")]
    UserNotFound,
    #[error("session missing or expired")]
    NeedLogin,
    #[error("mail delivery failed: {0}")]
    MailDelivery(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("storage error: {0}")]
    Storage(#[from] DbErr),
}

impl AccountError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<TransactionError<AccountError>> for AccountError {
    fn from(err: TransactionError<AccountError>) -> Self {
        match err {
            TransactionError::Connection(e) => Self::Storage(e),
            TransactionError::Transaction(e) => e,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{msg}")]
    Biz { code: i32, msg: String },
}

impl AppError {
    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::Biz { code: 1, msg: msg.into() }
    }

    pub fn fail(msg: impl Into<String>) -> Self {
        Self::Biz { code: 2, msg: msg.into() }
    }

    pub fn need_login() -> Self {
        Self::Biz { code: 3, msg: "please login first".to_string() }
    }

    pub fn forbidden() -> Self {
        Self::Biz { code: 4, msg: "forbidden".to_string() }
    }

    pub fn system_exception() -> Self {
        Self::Biz { code: 99, msg: "system_exception".to_string() }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Biz { code, .. } => *code,
        }
    }

    pub fn msg(&self) -> &str {
        match self {
            Self::Biz { msg, .. } => msg,
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => Self::param_error(msg),
            AccountError::DuplicateEmail
            | AccountError::TokenNotFound
            | AccountError::TokenExpired
            | AccountError::AccountNotActivated
            | AccountError::UserNotFound => Self::fail(err.to_string()),
            // Unknown email and wrong password read the same from outside.
            AccountError::InvalidCredentials => Self::fail("email and password do not match"),
            AccountError::NeedLogin => Self::need_login(),
            AccountError::Forbidden => Self::forbidden(),
            AccountError::MailDelivery(ref msg) => {
                error!("mail delivery failed: {}", msg);
                Self::fail("activation mail could not be sent")
            }
            AccountError::EntropyUnavailable | AccountError::Internal(_) | AccountError::Storage(_) => {
                error!("request failed: {}", err);
                Self::system_exception()
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        response_from_error(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_credentials_message_is_uniform() {
        let app: AppError = AccountError::InvalidCredentials.into();
        assert_eq!(app.code(), 2);
        assert_eq!(app.msg(), "email and password do not match");
    }

    #[test]
    fn forbidden_maps_to_its_own_code() {
        let app: AppError = AccountError::Forbidden.into();
        assert_eq!(app.code(), 4);
    }

    #[test]
    fn storage_errors_are_masked() {
        let app: AppError = AccountError::Storage(DbErr::Custom("disk on fire".into())).into();
        assert_eq!(app.code(), 99);
        assert_eq!(app.msg(), "system_exception");
    }

    #[test]
    fn validation_keeps_message() {
        let app: AppError = AccountError::validation("name is required").into();
        assert_eq!(app.code(), 1);
        assert_eq!(app.msg(), "name is required");
    }
}
