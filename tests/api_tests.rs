//! End-to-end tests: the HTTP service and the sync client against a live
//! server on an ephemeral port.

use tareas::client::sync::{BackendStatus, ListView, SyncState};
use tareas::client::{ApiClient, ClientError};
use tareas::config::{ClientConfig, ServerConfig};
use tareas::db::Database;
use tareas::server;
use tareas::types::TaskPatch;
use tokio::sync::oneshot;

/// Spawn the API on an ephemeral port, returning a client aimed at it.
///
/// The returned database handle shares the server's connection, so tests
/// can assert on (or tamper with) stored state directly. The shutdown
/// sender must be kept alive for the server's lifetime.
async fn spawn_api() -> (ApiClient, Database, oneshot::Sender<()>) {
    let db = Database::open_in_memory().expect("in-memory database");
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let (shutdown, addr) = server::start_server(db.clone(), &config)
        .await
        .expect("start server");

    let client = ApiClient::new(&ClientConfig {
        base_url: format!("http://{addr}"),
        timeout_seconds: 5,
    })
    .expect("build client");

    (client, db, shutdown)
}

/// Spawn a stub backend whose `/health` reports a disconnected database,
/// for exercising the reachable-but-degraded path.
async fn spawn_degraded_backend() -> (ApiClient, oneshot::Sender<()>) {
    use axum::{Json, Router, http::StatusCode, routing::get};

    let app = Router::new().route(
        "/health",
        get(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "database": "disconnected",
                    "error": "No se pudo consultar la base de datos"
                })),
            )
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("stub backend address");
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("stub backend");
    });

    let client = ApiClient::new(&ClientConfig {
        base_url: format!("http://{addr}"),
        timeout_seconds: 5,
    })
    .expect("build client");

    (client, shutdown)
}

/// Client aimed at a port nothing listens on.
fn unreachable_client() -> ApiClient {
    ApiClient::new(&ClientConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 1,
    })
    .expect("build client")
}

mod endpoint_tests {
    use super::*;

    #[tokio::test]
    async fn create_update_delete_roundtrip() {
        let (client, _db, _shutdown) = spawn_api().await;

        let created = client.create_task("Buy milk").await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.title, "Buy milk");
        assert!(!created.completed);

        let updated = client
            .update_task(created.id, &TaskPatch::completed(true))
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Buy milk");

        let deleted = client.delete_task(created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(deleted.completed);

        let err = client.get_task(created.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn blank_title_is_rejected_with_400() {
        let (client, db, _shutdown) = spawn_api().await;

        let err = client.create_task("   ").await.unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "El título es requerido");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(db.list_tasks().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_maps_to_404_with_spanish_message() {
        let (client, _db, _shutdown) = spawn_api().await;

        let err = client
            .update_task(999, &TaskPatch::completed(true))
            .await
            .unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Tarea no encontrada");
            }
            other => panic!("expected Api error, got {other:?}"),
        }

        let err = client.delete_task(999).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn list_returns_newest_first() {
        let (client, _db, _shutdown) = spawn_api().await;

        let a = client.create_task("primera").await.unwrap();
        let b = client.create_task("segunda").await.unwrap();

        let tasks = client.list_tasks().await.unwrap();
        assert_eq!(tasks[0].id, b.id);
        assert_eq!(tasks[1].id, a.id);
    }

    #[tokio::test]
    async fn health_reports_connected_database() {
        let (client, _db, _shutdown) = spawn_api().await;

        let health = client.health().await.unwrap();

        assert_eq!(health.status, "healthy");
        assert_eq!(health.database, "connected");
        assert!(health.database_connected());
        assert!(health.timestamp.is_some());
    }
}

mod sync_tests {
    use super::*;

    #[tokio::test]
    async fn load_fetches_list_after_health_check() {
        let (client, db, _shutdown) = spawn_api().await;
        db.create_task("Comprar leche").unwrap();

        let mut state = SyncState::new(client);
        state.load().await.unwrap();

        assert_eq!(state.status(), BackendStatus::Connected);
        assert_eq!(*state.view(), ListView::Ready);
        assert_eq!(state.tasks().len(), 1);
    }

    #[tokio::test]
    async fn load_on_empty_backend_is_empty_not_error() {
        let (client, _db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();

        assert_eq!(*state.view(), ListView::Empty);
        assert!(state.tasks().is_empty());
    }

    #[tokio::test]
    async fn load_fails_fast_when_backend_unreachable() {
        let mut state = SyncState::new(unreachable_client());

        let err = state.load().await.unwrap_err();

        assert!(matches!(err, ClientError::Unreachable(_)));
        assert_eq!(state.status(), BackendStatus::Disconnected);
        assert_eq!(*state.view(), ListView::Unreachable);
        assert!(state.tasks().is_empty());
    }

    #[tokio::test]
    async fn load_reports_degraded_database_as_error_not_unreachable() {
        let (client, _shutdown) = spawn_degraded_backend().await;

        let mut state = SyncState::new(client);
        let err = state.load().await.unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Base de datos desconectada");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        // The backend answered, so this is not the unreachable state.
        assert_eq!(state.status(), BackendStatus::Connected);
        assert_eq!(
            *state.view(),
            ListView::Error("Base de datos desconectada".to_string())
        );
        assert!(state.tasks().is_empty());
    }

    #[tokio::test]
    async fn create_prepends_server_assigned_row() {
        let (client, _db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();
        state.create("primera").await.unwrap();
        let created = state.create("segunda").await.unwrap();

        assert!(created.id > 0);
        assert_eq!(state.tasks()[0].title, "segunda");
        assert_eq!(state.tasks()[1].title, "primera");
        assert_eq!(*state.view(), ListView::Ready);
    }

    #[tokio::test]
    async fn failed_create_leaves_collection_unchanged() {
        let (client, _db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();
        state.create("primera").await.unwrap();

        let err = state.create("   ").await.unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 400, .. }));
        assert_eq!(state.tasks().len(), 1);
    }

    #[tokio::test]
    async fn toggle_confirms_with_server_row() {
        let (client, db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();
        let id = state.create("Comprar leche").await.unwrap().id;

        state.toggle_completed(id).await.unwrap();

        assert!(state.tasks()[0].completed);
        // The server agrees; this was not a local-only flip.
        assert!(db.get_task(id).unwrap().unwrap().completed);
    }

    #[tokio::test]
    async fn toggle_rolls_back_when_server_rejects() {
        let (client, db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();
        let id = state.create("Comprar leche").await.unwrap().id;

        // Simulate drift: another client deleted the row server-side.
        db.delete_task(id).unwrap();

        let err = state.toggle_completed(id).await.unwrap_err();

        assert!(matches!(err, ClientError::Api { status: 404, .. }));
        // The optimistic flip was reverted; the stale entry stays until a
        // refresh resynchronizes.
        assert!(!state.tasks()[0].completed);

        state.refresh().await.unwrap();
        assert!(state.tasks().is_empty());
        assert_eq!(*state.view(), ListView::Empty);
    }

    #[tokio::test]
    async fn delete_removes_local_entry_on_success_only() {
        let (client, _db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();
        let id = state.create("Comprar leche").await.unwrap().id;

        let deleted = state.delete(id).await.unwrap();
        assert_eq!(deleted.title, "Comprar leche");
        assert!(state.tasks().is_empty());
        assert_eq!(*state.view(), ListView::Empty);

        // Deleting again fails and leaves the (empty) collection alone.
        let err = state.delete(id).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn update_replaces_entry_with_server_row() {
        let (client, _db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();
        let id = state.create("antes").await.unwrap().id;

        state.update(id, TaskPatch::title("después")).await.unwrap();

        assert_eq!(state.tasks()[0].title, "después");
        assert!(state.tasks()[0].updated_at >= state.tasks()[0].created_at);
    }

    #[tokio::test]
    async fn refresh_replaces_entire_collection() {
        let (client, db, _shutdown) = spawn_api().await;

        let mut state = SyncState::new(client);
        state.load().await.unwrap();

        // Server-side changes the client has not seen yet.
        db.create_task("externa").unwrap();

        state.refresh().await.unwrap();

        assert_eq!(state.tasks().len(), 1);
        assert_eq!(state.tasks()[0].title, "externa");
        assert_eq!(*state.view(), ListView::Ready);
    }
}
