//! HTTP handlers for the control server

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::state::AppState;
use crate::error::SyncError;
use crate::sync::SyncMode;

#[derive(Debug, Deserialize)]
pub struct ListDirQuery {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetPathRequest {
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SyncRequest {
    pub mode: Option<SyncMode>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: String,
}

fn status_json(status: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(StatusResponse {
        status: status.into(),
    })
}

/// GET /list_dir?path=...
///
/// Unreadable or missing paths list as empty.
pub async fn list_dir(query: web::Query<ListDirQuery>) -> HttpResponse {
    let Some(path) = query.into_inner().path else {
        return HttpResponse::Ok().json(Vec::<DirEntryInfo>::new());
    };

    let entries = web::block(move || read_entries(Path::new(&path)))
        .await
        .unwrap_or_default();
    HttpResponse::Ok().json(entries)
}

fn read_entries(path: &Path) -> Vec<DirEntryInfo> {
    let reader = match std::fs::read_dir(path) {
        Ok(reader) => reader,
        Err(e) => {
            tracing::debug!("Cannot list {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut entries: Vec<DirEntryInfo> = reader
        .filter_map(|entry| entry.ok())
        .map(|entry| DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir: entry.file_type().map(|t| t.is_dir()).unwrap_or(false),
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// POST /set_src_dir
pub async fn set_src_dir(
    state: web::Data<AppState>,
    body: web::Json<SetPathRequest>,
) -> HttpResponse {
    let path = PathBuf::from(body.into_inner().path);
    tracing::info!("Source root set to {}", path.display());
    state.set_source(path);
    HttpResponse::Ok().json(serde_json::json!({}))
}

/// POST /set_dst_dir
pub async fn set_dst_dir(
    state: web::Data<AppState>,
    body: web::Json<SetPathRequest>,
) -> HttpResponse {
    let path = PathBuf::from(body.into_inner().path);
    tracing::info!("Destination root set to {}", path.display());
    state.set_destination(path);
    HttpResponse::Ok().json(serde_json::json!({}))
}

/// POST /sync
///
/// Claims the engine synchronously, then runs the pass on a blocking worker.
/// The body is optional; without one the pass is two-way.
pub async fn start_sync(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let request = if body.is_empty() {
        SyncRequest::default()
    } else {
        match serde_json::from_slice::<SyncRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                return HttpResponse::BadRequest().json(serde_json::json!({
                    "error": format!("Invalid sync request: {}", e)
                }))
            }
        }
    };

    let permit = match state.engine.begin() {
        Ok(permit) => permit,
        Err(SyncError::AlreadyRunning) => return status_json("already running"),
        Err(e) => {
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": e.to_string()
            }))
        }
    };

    let session = state.session(request.mode.unwrap_or_default());
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = engine.execute(permit, &session) {
            tracing::warn!("Background sync failed: {}", e);
        }
    });

    status_json("started")
}

/// GET /status
pub async fn get_status(state: web::Data<AppState>) -> HttpResponse {
    status_json(state.engine.context().status().to_string())
}

/// GET /conflicts
pub async fn get_conflicts(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.engine.context().conflicts())
}

/// GET /logs
pub async fn get_logs(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(state.engine.context().log().contents())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::configure_routes;
    use crate::server::state::Roots;
    use crate::sync::context::SyncContext;
    use crate::sync::SyncEngine;
    use actix_web::{test, App};
    use filetime::{set_file_mtime, FileTime};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn app_state(source: &Path, destination: &Path) -> web::Data<AppState> {
        let engine = SyncEngine::new(Arc::new(SyncContext::in_memory()));
        web::Data::new(AppState::with_roots(
            engine,
            Roots {
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
            },
        ))
    }

    async fn wait_until_idle(state: &web::Data<AppState>) {
        for _ in 0..200 {
            if !state.engine.context().status().is_running() {
                return;
            }
            actix_web::rt::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("sync did not finish");
    }

    #[actix_web::test]
    async fn test_list_dir() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("file.txt"), "x").unwrap();

        let state = app_state(temp.path(), temp.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let uri = format!("/list_dir?path={}", temp.path().display());
        let req = test::TestRequest::get().uri(&uri).to_request();
        let body: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.len(), 2);
        assert_eq!(body[0]["name"], "file.txt");
        assert_eq!(body[0]["is_dir"], false);
        assert_eq!(body[1]["name"], "sub");
        assert_eq!(body[1]["is_dir"], true);
    }

    #[actix_web::test]
    async fn test_list_dir_unreadable_is_empty() {
        let temp = TempDir::new().unwrap();
        let state = app_state(temp.path(), temp.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let uri = format!("/list_dir?path={}/missing", temp.path().display());
        let req = test::TestRequest::get().uri(&uri).to_request();
        let body: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert!(body.is_empty());
    }

    #[actix_web::test]
    async fn test_set_dirs() {
        let temp = TempDir::new().unwrap();
        let state = app_state(Path::new("/"), Path::new("/"));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/set_src_dir")
            .set_json(serde_json::json!({ "path": temp.path() }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::post()
            .uri("/set_dst_dir")
            .set_json(serde_json::json!({ "path": "/tmp/elsewhere" }))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let roots = state.roots();
        assert_eq!(roots.source, temp.path());
        assert_eq!(roots.destination, PathBuf::from("/tmp/elsewhere"));

        let req = test::TestRequest::post()
            .uri("/set_src_dir")
            .insert_header(("content-type", "application/json"))
            .set_payload("not json")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn test_sync_reports_conflicts_and_logs() {
        let (a, b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        std::fs::write(a.path().join("notes.txt"), "0123456789").unwrap();
        std::fs::write(b.path().join("notes.txt"), "0123456789ab").unwrap();
        std::fs::write(b.path().join("old.txt"), "old").unwrap();
        for path in [a.path().join("notes.txt"), b.path().join("notes.txt")] {
            set_file_mtime(&path, FileTime::from_unix_time(1_700_000_000, 0)).unwrap();
        }

        let state = app_state(a.path(), b.path());
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/sync").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "started");

        wait_until_idle(&state).await;

        let req = test::TestRequest::get().uri("/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "done");

        let req = test::TestRequest::get().uri("/conflicts").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!([{ "path": "notes.txt" }]));

        // Two-way by default: the destination-only file is created in the source
        assert!(a.path().join("old.txt").exists());

        let req = test::TestRequest::get().uri("/logs").to_request();
        let logs = test::call_and_read_body(&app, req).await;
        let logs = String::from_utf8(logs.to_vec()).unwrap();
        assert!(logs.contains("created: old.txt"));
        assert!(logs.contains("conflict: notes.txt"));
    }

    #[actix_web::test]
    async fn test_sync_one_way_mode() {
        let (a, b) = (TempDir::new().unwrap(), TempDir::new().unwrap());
        std::fs::write(b.path().join("old.txt"), "old").unwrap();

        let state = app_state(a.path(), b.path());
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/sync")
            .set_json(serde_json::json!({ "mode": "one_way" }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "started");

        wait_until_idle(&state).await;
        assert!(!b.path().join("old.txt").exists());
    }

    #[actix_web::test]
    async fn test_sync_rejected_while_running() {
        let temp = TempDir::new().unwrap();
        let state = app_state(temp.path(), temp.path());
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_routes),
        )
        .await;

        let _permit = state.engine.begin().unwrap();

        let req = test::TestRequest::post().uri("/sync").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "already running");
    }

    #[actix_web::test]
    async fn test_sync_bad_mode_is_400() {
        let temp = TempDir::new().unwrap();
        let state = app_state(temp.path(), temp.path());
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/sync")
            .set_payload(r#"{"mode":"sideways"}"#)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn test_status_reports_error_message() {
        let temp = TempDir::new().unwrap();
        let state = app_state(temp.path(), &temp.path().join("missing"));
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/sync").to_request();
        test::call_service(&app, req).await;
        wait_until_idle(&state).await;

        let req = test::TestRequest::get().uri("/status").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let status = body["status"].as_str().unwrap();
        assert!(status.starts_with("error: "), "{status}");
    }
}
