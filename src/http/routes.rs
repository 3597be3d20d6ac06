use actix_web::web;

use super::handlers;

/// Mounts the task and webhook surface (spec.md S6).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::post().to(handlers::create_task))
            .route("", web::get().to(handlers::list_tasks))
            .route("/{id}", web::get().to(handlers::get_task)),
    );
    cfg.service(
        web::scope("/webhooks")
            .route("/stt", web::post().to(handlers::sync_stt_webhook))
            .route("/subscription", web::post().to(handlers::subscription_webhook)),
    );
}
