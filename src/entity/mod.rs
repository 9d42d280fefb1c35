pub mod follower;
pub mod post;
pub mod session;
pub mod user;
