//! Handlers for `/fees` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/fees` | Optional `student_id`, `month` (`MM/YYYY`), `status` |
//! | `POST`   | `/fees` | Body: [`FeeRecordInput`]; 201, or 409 if the month exists |
//! | `PUT`    | `/fees` | Body: [`FeeRecordInput`]; create or update the month |
//! | `GET`    | `/fees/:id` | Admin, the student, or their guardian |
//! | `DELETE` | `/fees/:id` | 204 |
//! | `POST`   | `/fees/:id/status` | Body: `{"status":"paid"}` |
//! | `POST`   | `/fees/bulk-status` | Body: `{"fee_ids":[...],"status":"overdue"}` |
//! | `GET`    | `/fees/summary` | `?month=MM/YYYY`; admin only |
//!
//! Every write goes through the store's recompute cascade, so guardian
//! balances and active flags read afterwards are current.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use edutrack_core::{
  fee::{FeeQuery, FeeRecord, FeeRecordInput, FeeStatus, FeeSummary},
  month::Month,
  policy::{Operation, Target},
  store::SchoolStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  actor::CurrentActor,
  error::ApiError,
  students::{self, student_target},
};

/// A fee record plus its past-due display hint, judged against the store's
/// own date.
#[derive(Debug, Serialize)]
pub struct FeeView {
  #[serde(flatten)]
  pub record:      FeeRecord,
  pub is_past_due: bool,
}

impl FeeView {
  pub fn new(record: FeeRecord, today: NaiveDate) -> Self {
    let is_past_due = record.is_past_due(today);
    Self { record, is_past_due }
  }
}

fn views(records: Vec<FeeRecord>, today: NaiveDate) -> Vec<FeeView> {
  records
    .into_iter()
    .map(|record| FeeView::new(record, today))
    .collect()
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub student_id: Option<Uuid>,
  pub month:      Option<Month>,
  pub status:     Option<FeeStatus>,
}

/// `GET /fees[?student_id=..][&month=MM/YYYY][&status=..]`
///
/// Without `student_id` only admins may list.
pub async fn list<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<FeeView>>, ApiError>
where
  S: SchoolStore,
{
  let target = match params.student_id {
    Some(id) => student_target(&students::load(store.as_ref(), id).await?),
    None => Target::Any,
  };
  actor.authorize(Operation::ViewFees, target)?;

  let query = FeeQuery {
    student_id: params.student_id,
    month:      params.month,
    status:     params.status,
  };
  let records = store.list_fee_records(&query).await.map_err(ApiError::store)?;
  Ok(Json(views(records, store.today())))
}

// ─── Create / upsert ──────────────────────────────────────────────────────────

/// `POST /fees`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Json(body): Json<FeeRecordInput>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageFees, Target::Any)?;
  let record = store.create_fee_record(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(FeeView::new(record, store.today()))))
}

/// `PUT /fees`
pub async fn upsert<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Json(body): Json<FeeRecordInput>,
) -> Result<Json<FeeView>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageFees, Target::Any)?;
  let record = store.upsert_fee_record(body).await.map_err(ApiError::store)?;
  Ok(Json(FeeView::new(record, store.today())))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /fees/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<FeeView>, ApiError>
where
  S: SchoolStore,
{
  let record = store
    .get_fee_record(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("fee record {id} not found")))?;
  let student = students::load(store.as_ref(), record.student_id).await?;
  actor.authorize(Operation::ViewFees, student_target(&student))?;
  Ok(Json(FeeView::new(record, store.today())))
}

/// `DELETE /fees/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageFees, Target::Any)?;
  store.delete_fee_record(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: FeeStatus,
}

/// `POST /fees/:id/status`
pub async fn set_status<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<FeeView>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageFees, Target::Any)?;
  let record = store
    .set_fee_status(id, body.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(FeeView::new(record, store.today())))
}

#[derive(Debug, Deserialize)]
pub struct BulkStatusBody {
  pub fee_ids: Vec<Uuid>,
  pub status:  FeeStatus,
}

/// `POST /fees/bulk-status`; all-or-nothing.
pub async fn bulk_status<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Json(body): Json<BulkStatusBody>,
) -> Result<Json<Vec<FeeView>>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageFees, Target::Any)?;
  if body.fee_ids.is_empty() {
    return Err(ApiError::BadRequest("fee_ids must not be empty".into()));
  }
  let records = store
    .bulk_set_fee_status(body.fee_ids, body.status)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(views(records, store.today())))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub month: Month,
}

/// `GET /fees/summary?month=MM/YYYY`
pub async fn summary<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Query(params): Query<SummaryParams>,
) -> Result<Json<FeeSummary>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ViewFeeSummary, Target::Any)?;
  let summary = store.month_summary(params.month).await.map_err(ApiError::store)?;
  Ok(Json(summary))
}
