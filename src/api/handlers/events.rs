//! Event policy introspection.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::app_state::AppState;
use crate::domain::ForwardPolicy;

/// One row of the effective policy table.
#[derive(Debug, Serialize)]
struct EventPolicyInfo {
    event: String,
    policy: ForwardPolicy,
}

/// `GET /events`: Event names the relay forwards and how.
pub async fn list_event_policies(State(state): State<AppState>) -> impl IntoResponse {
    let rows: Vec<EventPolicyInfo> = state
        .router
        .policies()
        .entries()
        .into_iter()
        .map(|(event, policy)| EventPolicyInfo {
            event: event.to_string(),
            policy,
        })
        .collect();
    (StatusCode::OK, Json(rows))
}

/// Event routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(list_event_policies))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::config::BrokerConfig;

    #[tokio::test]
    async fn lists_policy_table() {
        let Ok(config) = BrokerConfig::from_lookup(|_| None) else {
            panic!("default config must load");
        };
        let Ok(request) = Request::builder().uri("/events").body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(response) = routes()
            .with_state(AppState::new(&config))
            .oneshot(request)
            .await
        else {
            panic!("router is infallible");
        };
        assert_eq!(response.status(), StatusCode::OK);

        let Ok(body) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("readable body");
        };
        let Ok(rows) = serde_json::from_slice::<Vec<serde_json::Value>>(&body) else {
            panic!("json array body");
        };
        assert_eq!(rows.len(), 10);
        let attention = rows.iter().find(|r| r["event"] == "attention");
        let Some(attention) = attention else {
            panic!("attention row missing");
        };
        assert_eq!(attention["policy"], "broadcast-all");
    }
}
