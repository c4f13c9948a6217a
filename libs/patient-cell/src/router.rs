use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use shared_utils::extractor::auth_middleware;

use crate::handlers::{lookup_patient, register_patient, PatientState};

pub fn patient_routes(state: PatientState) -> Router {
    let protected_routes = Router::new()
        .route("/lookup", get(lookup_patient))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .route("/register", post(register_patient))
        .merge(protected_routes)
        .with_state(state)
}
