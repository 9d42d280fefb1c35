pub mod activation;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod feed;
pub mod follow;
pub mod mailer;
pub mod password;
pub mod password_reset;
pub mod policy;
pub mod post_store;
pub mod response;
pub mod routes;
pub mod session;
pub mod token;
pub mod users;
