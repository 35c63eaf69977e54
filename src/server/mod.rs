//! HTTP control surface.
//!
//! Lets a browser pick the two roots, trigger a run, and poll its status,
//! conflicts and log. Runs execute on blocking workers; the engine's context
//! rejects a second trigger while one is running.

mod handlers;
pub mod state;

pub use state::{AppState, Roots};

use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use std::path::PathBuf;

use crate::config::ServerSettings;
use crate::sync::SyncEngine;

/// Register the control API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    use handlers::*;

    cfg.route("/list_dir", web::get().to(list_dir))
        .route("/set_src_dir", web::post().to(set_src_dir))
        .route("/set_dst_dir", web::post().to(set_dst_dir))
        .route("/sync", web::post().to(start_sync))
        .route("/status", web::get().to(get_status))
        .route("/conflicts", web::get().to(get_conflicts))
        .route("/logs", web::get().to(get_logs));
}

/// Serve the control API until the server is stopped
pub async fn start_server(settings: ServerSettings, engine: SyncEngine) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(engine));
    let web_root = settings.web_root.as_ref().map(PathBuf::from);

    tracing::info!("Control server listening on {}:{}", settings.bind, settings.port);
    if let Some(root) = &web_root {
        tracing::info!("Serving static files from {}", root.display());
    }

    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes);

        // Registered last so API routes take precedence
        if let Some(root) = &web_root {
            app = app.service(Files::new("/", root).index_file("index.html"));
        }
        app
    })
    .bind((settings.bind.as_str(), settings.port))?
    .run()
    .await
}
