pub mod cors;
pub mod feed;
pub mod follow;
pub mod password;
pub mod post;
pub mod session;
pub mod user;

use actix_web::web;

/// Everything served under `/api`.
pub fn api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::scope("/user").configure(user::config))
            .service(web::scope("/session").configure(session::config))
            .service(web::scope("/password").configure(password::config))
            .service(web::scope("/follow").configure(follow::config))
            .service(web::scope("/post").configure(post::config))
            .service(web::scope("/feed").configure(feed::config)),
    );
}
