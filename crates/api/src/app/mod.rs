//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store selection and the service bundle
//! - `routes/`: HTTP routes + handlers (accounts, transactions, system)
//! - `dto.rs`: response DTOs
//! - `pagination.rs`: limit/offset windows and paginated bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use ledger_infra::{LedgerStore, StoreError};

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod pagination;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: ApiConfig) -> Result<Router, StoreError> {
    let jwt_secret = config.jwt_secret.clone();
    Ok(match services::configured_store(&config).await? {
        services::ConfiguredStore::InMemory(store) => build_router(jwt_secret, store),
        services::ConfiguredStore::Postgres(store) => build_router(jwt_secret, store),
    })
}

/// Router over an explicit store.
pub fn build_router<S>(jwt_secret: String, store: S) -> Router
where
    S: LedgerStore + 'static,
{
    let jwt = Arc::new(ledger_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::AppServices::new(store));

    // Protected routes: require a bearer token.
    let protected = routes::router::<S>()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)))
}
