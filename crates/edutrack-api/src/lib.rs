//! JSON REST API for EduTrack.
//!
//! Exposes an axum [`Router`] backed by any
//! [`edutrack_core::store::SchoolStore`]. Every handler resolves the caller
//! from the `x-actor-id` / `x-actor-role` headers and consults
//! [`edutrack_core::policy::can`] before touching the store. Authentication,
//! TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", edutrack_api::api_router(store.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod fees;
pub mod guardians;
pub mod roadmap;
pub mod students;
pub mod topics;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use edutrack_core::store::SchoolStore;

pub use actor::CurrentActor;
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
    // Guardians & students
    .route("/guardians", post(guardians::create::<S>))
    .route("/guardians/{id}", get(guardians::get_one::<S>))
    .route("/students", get(students::list::<S>).post(students::create::<S>))
    .route("/students/{id}", get(students::get_one::<S>))
    .route("/students/{id}/guardian", put(students::assign_guardian::<S>))
    // Fee ledger
    .route(
      "/fees",
      get(fees::list::<S>)
        .post(fees::create::<S>)
        .put(fees::upsert::<S>),
    )
    .route("/fees/summary", get(fees::summary::<S>))
    .route("/fees/bulk-status", post(fees::bulk_status::<S>))
    .route("/fees/{id}", get(fees::get_one::<S>).delete(fees::delete_one::<S>))
    .route("/fees/{id}/status", post(fees::set_status::<S>))
    // Roadmap
    .route("/topics", get(topics::list::<S>).post(topics::create::<S>))
    .route(
      "/topics/{id}",
      get(topics::get_one::<S>)
        .patch(topics::update::<S>)
        .delete(topics::delete_one::<S>),
    )
    .route("/topics/{id}/children", get(topics::children::<S>))
    .route("/topics/{id}/depth", get(topics::depth::<S>))
    .route("/topics/{id}/descendants", get(topics::descendants::<S>))
    .route("/roadmap/tree", get(roadmap::tree::<S>))
    .route("/roadmap/progress", get(roadmap::progress::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests;
