//! Handlers for `/guardians` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/guardians` | Body: `{"name":"..."}`; admin only |
//! | `GET`  | `/guardians/:id` | Admin, or the guardian themself |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use edutrack_core::{
  policy::{Operation, Target},
  school::{Guardian, NewGuardian},
  store::SchoolStore,
};
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

/// `POST /guardians`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Json(body): Json<NewGuardian>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageGuardians, Target::Any)?;
  let guardian = store.add_guardian(body).await.map_err(ApiError::store)?;
  tracing::info!(guardian_id = %guardian.guardian_id, "guardian added");
  Ok((StatusCode::CREATED, Json(guardian)))
}

/// `GET /guardians/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Guardian>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewGuardian, Target::Guardian { guardian_id: id })?;
  let guardian = store
    .get_guardian(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("guardian {id} not found")))?;
  Ok(Json(guardian))
}
