use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use log::{error, info};

use weibo_backend::config::AppConfig;
use weibo_backend::db::connect_db;
use weibo_backend::mailer::{self, Mailer};
use weibo_backend::response::json_error_handler;
use weibo_backend::{routes, session};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let config = AppConfig::from_env();
    let db = connect_db(&config).await.map_err(|e| {
        error!("db connect failed: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;
    match session::purge_expired(&db).await {
        Ok(n) if n > 0 => info!("purged {} expired session(s)", n),
        Ok(_) => {}
        Err(e) => error!("session purge failed: {}", e),
    }

    let mailer: Arc<dyn Mailer> = Arc::from(mailer::from_config(&config));
    let mailer = web::Data::from(mailer);
    let server_port = config.server_port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(mailer.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(middleware::Logger::default())
            .wrap(middleware::from_fn(routes::cors::cors_handler))
            .configure(routes::api)
    })
    .bind(("0.0.0.0", server_port))?;
    info!("server started at http://0.0.0.0:{}", server_port);
    server.run().await
}
