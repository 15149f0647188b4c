//! JSON REST API for Darasa.
//!
//! Exposes an axum [`Router`] backed by any [`darasa_core::store::SchoolStore`].
//! Authentication, TLS, and transport concerns are the caller's
//! responsibility; the caller's identity arrives in the headers read by
//! [`context::Actor`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", darasa_api::api_router(store.clone()))
//! ```

pub mod context;
pub mod counties;
pub mod error;
pub mod performance;
pub mod registry;
pub mod transfers;
pub mod transitions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use darasa_core::store::SchoolStore;

pub use context::Actor;
pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: SchoolStore + 'static,
{
  Router::new()
    // Performance
    .route(
      "/performance",
      get(performance::list::<S>).post(performance::create::<S>),
    )
    .route("/performance/report", get(performance::report::<S>))
    .route("/performance/summary", get(performance::summary::<S>))
    // Counties
    .route("/counties/{county}/overview", get(counties::overview::<S>))
    .route("/counties/{county}/report", get(counties::report::<S>))
    .route("/counties/{county}/sub_counties", get(counties::sub_counties::<S>))
    // Grade transitions
    .route("/transitions", post(transitions::bulk::<S>))
    .route("/students/{id}/transition", post(transitions::single::<S>))
    // Transfers
    .route("/transfers", get(transfers::list::<S>).post(transfers::create::<S>))
    .route("/transfers/{id}/approve", post(transfers::approve::<S>))
    .route("/transfers/{id}/reject", post(transfers::reject::<S>))
    // Registry
    .route("/users", post(registry::create_user::<S>))
    .route(
      "/users/{id}",
      put(registry::update_user::<S>).delete(registry::delete_user::<S>),
    )
    .route("/schools", post(registry::create_school::<S>))
    .route(
      "/schools/{id}",
      get(registry::get_school::<S>)
        .put(registry::update_school::<S>)
        .delete(registry::delete_school::<S>),
    )
    .route(
      "/students",
      get(registry::list_students::<S>).post(registry::create_student::<S>),
    )
    .route(
      "/students/{id}",
      get(registry::get_student::<S>).put(registry::update_student::<S>),
    )
    .route("/staff", get(registry::get_staff::<S>).post(registry::create_staff::<S>))
    .route("/staff/{id}", put(registry::update_staff::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests;
