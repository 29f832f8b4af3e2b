//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::monitor::Monitor;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

/// The JSON API server.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    pub fn new(config: ServerConfig, monitor: Arc<Monitor>) -> Self {
        Self {
            config,
            state: AppState { monitor },
        }
    }

    /// Build the router with all routes.
    pub(crate) fn routes(state: AppState) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            .route("/api/health", get(handlers::handle_health))
            .route("/api/services", get(handlers::handle_get_services))
            .route("/api/services/{id}", get(handlers::handle_get_service))
            .route(
                "/api/services/{id}/history",
                get(handlers::handle_get_service_history),
            )
            .route(
                "/api/services/{id}/uptime",
                get(handlers::handle_get_service_uptime),
            )
            .route("/api/gpu", get(handlers::handle_get_gpu))
            .route("/api/alerts", get(handlers::handle_get_alerts))
            .route("/api/agents", get(handlers::handle_get_agents))
            .route(
                "/api/tickets",
                get(handlers::handle_list_tickets).post(handlers::handle_create_ticket),
            )
            .route(
                "/api/tickets/{id}",
                get(handlers::handle_get_ticket)
                    .put(handlers::handle_update_ticket)
                    .delete(handlers::handle_delete_ticket),
            )
            .route(
                "/api/ideas",
                get(handlers::handle_list_ideas).post(handlers::handle_create_idea),
            )
            .route(
                "/api/ideas/{id}",
                get(handlers::handle_get_idea)
                    .put(handlers::handle_update_idea)
                    .delete(handlers::handle_delete_idea),
            )
            .route("/api/ideas/{id}/convert", post(handlers::handle_convert_idea))
            .fallback(handlers::handle_api_fallback)
            .layer(cors)
            .with_state(state)
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = Self::routes(self.state.clone());

        tracing::info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::registry::Registry;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tempfile::NamedTempFile;
    use tower::ServiceExt;

    fn test_app() -> (NamedTempFile, Router) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let monitor = Arc::new(Monitor::new(Registry::new(vec![]), store));
        let app = Server::routes(AppState { monitor });
        (tmp, app)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (_tmp, app) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn services_report_cached_on_second_call() {
        let (_tmp, app) = test_app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/services").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["cached"], false);
        assert_eq!(body["services"], serde_json::json!([]));

        let response = app
            .oneshot(Request::builder().uri("/api/services").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["cached"], true);
    }

    #[tokio::test]
    async fn unknown_service_is_404() {
        let (_tmp, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/services/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unmatched_api_route_has_structured_body() {
        let (_tmp, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/bogus")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["path"], "/api/bogus");
        assert_eq!(body["method"], "POST");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn ticket_create_rejects_empty_title() {
        let (_tmp, app) = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tickets",
                serde_json::json!({"title": "  "}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["errors"].as_array().unwrap().len() > 0);
    }

    #[tokio::test]
    async fn ticket_create_applies_defaults() {
        let (_tmp, app) = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tickets",
                serde_json::json!({"title": "Replace the switch"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["id"], "TASK-001");
        assert_eq!(body["priority"], "medium");
        assert_eq!(body["lane"], "backlog");
    }

    #[tokio::test]
    async fn ticket_create_rejects_unknown_lane() {
        let (_tmp, app) = test_app();
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/tickets",
                serde_json::json!({"title": "ok", "lane": "parked"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn idea_convert_conflicts_on_second_call() {
        let (_tmp, app) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/ideas",
                serde_json::json!({"title": "Solar powered rack"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let idea = body_json(response).await;
        let id = idea["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/ideas/{}/convert", id),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["ticket"]["lane"], "backlog");

        let response = app
            .oneshot(json_request(
                "POST",
                &format!("/api/ideas/{}/convert", id),
                serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    fn seeded_app() -> (NamedTempFile, Router) {
        use crate::check::ServiceStatus;
        use crate::registry::{ProtocolKind, Target};

        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        store.record_check("svc", ServiceStatus::Up, 12).unwrap();
        store.record_check("svc", ServiceStatus::Up, 15).unwrap();

        let registry = Registry::new(vec![Target {
            id: "svc".to_string(),
            display_name: "Svc".to_string(),
            host: "10.0.0.9".to_string(),
            kind: ProtocolKind::Ping,
            url: None,
        }]);
        let monitor = Arc::new(Monitor::new(registry, store));
        let app = Server::routes(AppState { monitor });
        (tmp, app)
    }

    #[tokio::test]
    async fn history_endpoint_shape_and_clamping() {
        let (_tmp, app) = seeded_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/services/svc/history?hours=9999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["serviceId"], "svc");
        assert_eq!(body["serviceName"], "Svc");
        assert_eq!(body["hours"], 168);
        assert_eq!(body["entries"], 2);
        assert_eq!(body["history"][0]["status"], "up");
        assert_eq!(body["history"][0]["responseTimeMs"], 12);
    }

    #[tokio::test]
    async fn uptime_endpoint_summarizes_history() {
        let (_tmp, app) = seeded_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/services/svc/uptime")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["percentUp"], 100.0);
        assert_eq!(body["segments"][0]["status"], "up");
        assert_eq!(body["segments"][0]["count"], 2);
    }

    #[tokio::test]
    async fn alerts_endpoint_reports_count() {
        let (_tmp, app) = test_app();
        let response = app
            .oneshot(Request::builder().uri("/api/alerts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["count"], 0);
        assert_eq!(body["alerts"], serde_json::json!([]));
    }
}
