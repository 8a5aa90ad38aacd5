//! Handlers for `/topics` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/topics` | Optional `?owner_id` |
//! | `POST`   | `/topics` | Body: [`CreateBody`]; teachers only, owned by the caller |
//! | `GET`    | `/topics/:id` | 404 if not found |
//! | `PATCH`  | `/topics/:id` | Body: [`TopicPatch`]; owner only |
//! | `DELETE` | `/topics/:id` | Removes the subtree; owner only |
//! | `GET`    | `/topics/:id/children` | Ordered by `order`, then title |
//! | `GET`    | `/topics/:id/depth` | `{"topic_id":..,"depth":n}` |
//! | `GET`    | `/topics/:id/descendants` | Pre-order |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use edutrack_core::{
  policy::{Operation, Target},
  store::SchoolStore,
  topic::{NewTopic, ScheduledTest, Topic, TopicPatch, TopicStatus},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

async fn load<S>(store: &S, id: Uuid) -> Result<Topic, ApiError>
where
  S: SchoolStore,
{
  store
    .get_topic(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("topic {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub owner_id: Option<Uuid>,
}

/// `GET /topics[?owner_id=<id>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Topic>>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewRoadmap, Target::Any)?;
  let topics = store
    .list_topics(params.owner_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(topics))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// Topic fields supplied by the client; the owner is always the caller.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:           String,
  #[serde(default)]
  pub parent_id:       Option<Uuid>,
  #[serde(default)]
  pub description:     String,
  #[serde(default)]
  pub resources:       String,
  #[serde(default)]
  pub order:           i32,
  #[serde(default)]
  pub status:          TopicStatus,
  #[serde(default)]
  pub subject:         String,
  #[serde(default)]
  pub grade:           String,
  #[serde(default)]
  pub estimated_hours: Option<u32>,
  #[serde(default)]
  pub test:            Option<ScheduledTest>,
}

/// `POST /topics`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::CreateTopic, Target::Any)?;
  if body.title.trim().is_empty() {
    return Err(ApiError::BadRequest("title must not be empty".into()));
  }

  let input = NewTopic {
    owner_id:        actor.0.user_id,
    title:           body.title,
    parent_id:       body.parent_id,
    description:     body.description,
    resources:       body.resources,
    order:           body.order,
    status:          body.status,
    subject:         body.subject,
    grade:           body.grade,
    estimated_hours: body.estimated_hours,
    test:            body.test,
  };
  let topic = store.create_topic(input).await.map_err(ApiError::store)?;
  tracing::info!(topic_id = %topic.topic_id, owner_id = %topic.owner_id, "topic created");
  Ok((StatusCode::CREATED, Json(topic)))
}

// ─── Get / update / delete ────────────────────────────────────────────────────

/// `GET /topics/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Topic>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewRoadmap, Target::Any)?;
  Ok(Json(load(store.as_ref(), id).await?))
}

/// `PATCH /topics/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
  Json(patch): Json<TopicPatch>,
) -> Result<Json<Topic>, ApiError>
where
  S: SchoolStore,
{
  let topic = load(store.as_ref(), id).await?;
  actor.authorize(Operation::EditTopic, Target::Topic { owner_id: topic.owner_id })?;
  let topic = store
    .update_topic(id, actor.0.user_id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(topic))
}

/// `DELETE /topics/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: SchoolStore,
{
  let topic = load(store.as_ref(), id).await?;
  actor.authorize(Operation::EditTopic, Target::Topic { owner_id: topic.owner_id })?;
  let deleted = store
    .delete_topic(id, actor.0.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "deleted": deleted })))
}

// ─── Tree queries ─────────────────────────────────────────────────────────────

/// `GET /topics/:id/children`
pub async fn children<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Topic>>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewRoadmap, Target::Any)?;
  Ok(Json(store.children_of(id).await.map_err(ApiError::store)?))
}

#[derive(Debug, Serialize)]
pub struct DepthResponse {
  pub topic_id: Uuid,
  pub depth:    usize,
}

/// `GET /topics/:id/depth`
pub async fn depth<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<DepthResponse>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewRoadmap, Target::Any)?;
  let depth = store.topic_depth(id).await.map_err(ApiError::store)?;
  Ok(Json(DepthResponse { topic_id: id, depth }))
}

/// `GET /topics/:id/descendants`
pub async fn descendants<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Topic>>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewRoadmap, Target::Any)?;
  Ok(Json(store.descendants(id).await.map_err(ApiError::store)?))
}
