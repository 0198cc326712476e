use actix_cors::Cors;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::web::handlers;

/// Route table for the stateless chat variant.
pub fn configure_chat(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::scope("/api").route("/chat", web::post().to(handlers::chat)))
        .route("/", web::get().to(handlers::chat_health))
        .default_service(web::route().to(not_found));
}

/// Route table for the assistant variant.
pub fn configure_assistant(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(
            web::scope("/api")
                .route("/chat", web::post().to(handlers::assistant_chat))
                .route("/thread/new", web::post().to(handlers::new_thread)),
        )
        .route("/", web::get().to(handlers::assistant_health))
        .default_service(web::route().to(not_found));
}

/// CORS policy from configuration: permissive for `*`, otherwise locked to
/// the single configured origin.
pub fn cors(allowed_origin: &str) -> Cors {
    if allowed_origin == "*" {
        Cors::permissive()
    } else {
        Cors::default()
            .allowed_origin(allowed_origin)
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600)
    }
}

// Malformed JSON is the caller's fault; render it like any validation error
// instead of actix's default text body.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        let body = json!({ "error": format!("Invalid JSON body: {err}") });
        actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body))
            .into()
    })
}

async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Route not found" }))
}
