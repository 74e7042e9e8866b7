//! HTTP handlers and route configuration.

mod embed;
mod health;

use actix_web::{http::Method, web};

use crate::middleware::error::AppError;
use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Rate-limited routes
            .service(
                web::resource("/embed")
                    .wrap(RateLimitMiddleware::new(embed::RATE_LIMIT_BUCKET))
                    .route(web::post().to(embed::embed))
                    .route(web::method(Method::OPTIONS).to(embed::preflight)),
            ),
    );
}

/// Malformed or missing JSON bodies become `400 {"error": ...}`.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid request body: {err}")).into()
    })
}
