use crate::gui_bridge::model::DashboardModel;
use anyhow::Context;
use log::info;
use serde::Deserialize;
use serde_json::json;
use signalcore::control::SignalController;
use signalcore::prelude::Credential;
use signalcore::{ControlError, Direction};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

pub type SharedController = Arc<Mutex<SignalController>>;

#[derive(Debug, Deserialize)]
struct JunctionQuery {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OverrideQuery {
    direction: String,
}

/// Operator HTTP surface over a shared controller.
pub struct OperatorBridge {
    controller: SharedController,
}

impl OperatorBridge {
    pub fn new(controller: SharedController) -> Self {
        Self { controller }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let controller = self.controller.clone();
        let state = warp::any().map(move || controller.clone());

        let junctions = warp::path("junctions")
            .and(warp::path::end())
            .and(warp::get())
            .and(state.clone())
            .and_then(list_junctions);

        let view = warp::path("state")
            .and(warp::path::end())
            .and(warp::get())
            .and(state.clone())
            .and_then(current_state);

        let metrics = warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and(state.clone())
            .and_then(current_metrics);

        let select = warp::path("junction")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::query::<JunctionQuery>())
            .and(state.clone())
            .and_then(select_junction);

        let override_route = warp::path("override")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::query::<OverrideQuery>())
            .and(warp::header::optional::<String>("authorization"))
            .and(state)
            .and_then(override_signal);

        junctions
            .or(view)
            .or(metrics)
            .or(select)
            .or(override_route)
    }

    pub async fn serve(
        self,
        addr: SocketAddr,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(addr, shutdown)
            .with_context(|| format!("binding operator bridge on {}", addr))?;
        info!("operator bridge listening on {}", bound);
        server.await;
        Ok(())
    }
}

fn status_for(err: &ControlError) -> StatusCode {
    match err {
        ControlError::Parse(_) => StatusCode::BAD_REQUEST,
        ControlError::UnknownJunction(_) => StatusCode::NOT_FOUND,
        ControlError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        ControlError::SessionClosed => StatusCode::CONFLICT,
        ControlError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_reply(err: &ControlError) -> WithStatus<Json> {
    warp::reply::with_status(
        warp::reply::json(&json!({ "status": "error", "error": err.to_string() })),
        status_for(err),
    )
}

fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn list_junctions(controller: SharedController) -> Result<impl Reply, Infallible> {
    let guard = controller.lock().await;
    Ok(warp::reply::json(&guard.selection().catalog().entries()))
}

async fn current_state(controller: SharedController) -> Result<impl Reply, Infallible> {
    let guard = controller.lock().await;
    let metrics = guard.deps().metrics.snapshot();
    let model = DashboardModel::from_view(guard.view().as_ref(), metrics);
    Ok(warp::reply::json(&model))
}

async fn current_metrics(controller: SharedController) -> Result<impl Reply, Infallible> {
    let guard = controller.lock().await;
    Ok(warp::reply::json(&guard.deps().metrics.snapshot()))
}

async fn select_junction(
    query: JunctionQuery,
    controller: SharedController,
) -> Result<impl Reply, Infallible> {
    let mut guard = controller.lock().await;
    let reply = match guard.select_junction(&query.id).await {
        Ok(session) => warp::reply::with_status(
            warp::reply::json(&json!({ "status": "ok", "junction": session.junction() })),
            StatusCode::OK,
        ),
        Err(err) => error_reply(&err),
    };
    Ok(reply)
}

async fn override_signal(
    query: OverrideQuery,
    authorization: Option<String>,
    controller: SharedController,
) -> Result<impl Reply, Infallible> {
    let direction = match query.direction.parse::<Direction>() {
        Ok(direction) => direction,
        Err(err) => return Ok(error_reply(&err)),
    };
    let credential = authorization
        .as_deref()
        .and_then(bearer_token)
        .map(Credential::bearer);

    let guard = controller.lock().await;
    let reply = match guard.override_signal(direction, credential.as_ref()).await {
        Ok(state) => warp::reply::with_status(
            warp::reply::json(&json!({
                "status": "ok",
                "active": state.active,
                "remaining": state.remaining,
            })),
            StatusCode::OK,
        ),
        Err(err) => error_reply(&err),
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::authority::EchoAuthority;
    use crate::generator::profile::{GeneratorConfig, SyntheticFeeds};
    use crate::workflow::config::ControllerConfig;
    use signalcore::allocation::GreenTimeAllocator;
    use signalcore::authority::PresenceVerifier;
    use signalcore::control::SessionDeps;
    use signalcore::feeds::FeedLayout;
    use signalcore::telemetry::ControlMetrics;
    use std::time::Duration;

    fn bridge() -> OperatorBridge {
        let config = ControllerConfig::default();
        let feeds = Arc::new(SyntheticFeeds::new(
            GeneratorConfig::default(),
            FeedLayout::PerDirection,
        ));
        let deps = SessionDeps {
            feeds: feeds.clone(),
            layout: FeedLayout::PerDirection,
            authority: Arc::new(EchoAuthority::new(feeds)),
            verifier: Arc::new(PresenceVerifier),
            allocator: GreenTimeAllocator::default(),
            metrics: Arc::new(ControlMetrics::new()),
            tick_period: Duration::from_secs(3600),
        };
        let controller = SignalController::new(config.catalog(), deps);
        OperatorBridge::new(Arc::new(Mutex::new(controller)))
    }

    fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> serde_json::Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn lists_catalog() {
        let routes = bridge().routes();
        let response = warp::test::request()
            .method("GET")
            .path("/junctions")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let entries = body(&response);
        assert_eq!(entries.as_array().unwrap().len(), 4);
        assert_eq!(entries[3]["label"], "Rifatslu");
    }

    #[tokio::test]
    async fn selecting_junction_starts_monitoring() {
        let routes = bridge().routes();
        let missing = warp::test::request()
            .method("POST")
            .path("/junction?id=99_")
            .reply(&routes)
            .await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let idle = warp::test::request().path("/state").reply(&routes).await;
        assert_eq!(body(&idle)["running"], false);

        let selected = warp::test::request()
            .method("POST")
            .path("/junction?id=02_")
            .reply(&routes)
            .await;
        assert_eq!(selected.status(), StatusCode::OK);

        let state = warp::test::request().path("/state").reply(&routes).await;
        let state = body(&state);
        assert_eq!(state["junction"]["id"], "02_");
        assert_eq!(state["active"], "north");
        assert_eq!(state["remaining"], 30);
        assert_eq!(state["green"]["east"], 30);
        assert_eq!(state["total_green"], 120);
    }

    #[tokio::test]
    async fn override_checks_credential_and_direction() {
        let routes = bridge().routes();
        let no_session = warp::test::request()
            .method("POST")
            .path("/override?direction=east")
            .header("authorization", "Bearer operator")
            .reply(&routes)
            .await;
        assert_eq!(no_session.status(), StatusCode::CONFLICT);

        warp::test::request()
            .method("POST")
            .path("/junction?id=01_")
            .reply(&routes)
            .await;

        let anonymous = warp::test::request()
            .method("POST")
            .path("/override?direction=east")
            .reply(&routes)
            .await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let bad_direction = warp::test::request()
            .method("POST")
            .path("/override?direction=up")
            .header("authorization", "Bearer operator")
            .reply(&routes)
            .await;
        assert_eq!(bad_direction.status(), StatusCode::BAD_REQUEST);

        let accepted = warp::test::request()
            .method("POST")
            .path("/override?direction=east")
            .header("authorization", "Bearer operator")
            .reply(&routes)
            .await;
        assert_eq!(accepted.status(), StatusCode::OK);
        assert_eq!(body(&accepted)["active"], "east");

        let metrics = warp::test::request().path("/metrics").reply(&routes).await;
        let metrics = body(&metrics);
        assert_eq!(metrics["overrides"], 1);
        assert_eq!(metrics["overrides_rejected"], 1);
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
