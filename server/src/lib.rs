use axum::Router;
use control_service::{ControlState, FaultRegistry};
use std::sync::Arc;

/// Assemble the reference API under `/api` over `repo`.
///
/// Every route passes through the fault middleware, which leaves the
/// `/control/` endpoints alone. `faults` is shared so callers can inject
/// failures directly.
pub fn build_app(repo: Arc<dyn datastore::Repository>, faults: FaultRegistry) -> Router {
    let state = auth_service::ApiState::new(repo.clone());
    let control = ControlState {
        repo,
        faults: faults.clone(),
    };

    let api = Router::new()
        .merge(auth_service::create_router(state.clone()))
        .merge(video_service::create_router(state.clone()))
        .merge(comment_service::create_router(state))
        .merge(control_service::create_router(control));

    Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn_with_state(faults, control_service::fault_layer))
}
