//! Handlers for `/roadmap` endpoints: whole-forest views for dashboards.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/roadmap/tree` | Optional `owner_id`; `include_tests=true` adds test metadata |
//! | `GET`  | `/roadmap/progress` | Optional `owner_id` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use edutrack_core::{
  policy::{Operation, Target},
  roadmap::{RoadmapProgress, TreeNode, materialize_tree},
  store::SchoolStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TreeParams {
  pub owner_id:      Option<Uuid>,
  #[serde(default)]
  pub include_tests: bool,
}

/// `GET /roadmap/tree[?owner_id=<id>][&include_tests=true]`
pub async fn tree<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Query(params): Query<TreeParams>,
) -> Result<Json<Vec<TreeNode>>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewRoadmap, Target::Any)?;
  let topics = store
    .list_topics(params.owner_id)
    .await
    .map_err(ApiError::store)?;
  let today = params.include_tests.then(|| store.today());
  let nodes = materialize_tree(topics, today).map_err(ApiError::store)?;
  Ok(Json(nodes))
}

#[derive(Debug, Deserialize)]
pub struct ProgressParams {
  pub owner_id: Option<Uuid>,
}

/// `GET /roadmap/progress[?owner_id=<id>]`
pub async fn progress<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Query(params): Query<ProgressParams>,
) -> Result<Json<RoadmapProgress>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewRoadmap, Target::Any)?;
  let topics = store
    .list_topics(params.owner_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(RoadmapProgress::from_topics(&topics, store.today())))
}
