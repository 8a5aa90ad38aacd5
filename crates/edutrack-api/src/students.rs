//! Handlers for `/students` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/students` | Optional `?guardian_id`; filtered to what the actor may see |
//! | `POST` | `/students` | Body: [`NewStudent`]; admin or teacher |
//! | `GET`  | `/students/:id` | 404 if not found |
//! | `PUT`  | `/students/:id/guardian` | Body: `{"guardian_id":<uuid\|null>}`; admin only |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use edutrack_core::{
  policy::{Operation, Target},
  school::{NewStudent, Student},
  store::SchoolStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

pub(crate) fn student_target(student: &Student) -> Target {
  Target::Student {
    student_id:  student.student_id,
    guardian_id: student.guardian_id,
  }
}

/// Load a student or fail with 404.
pub(crate) async fn load<S>(store: &S, id: Uuid) -> Result<Student, ApiError>
where
  S: SchoolStore,
{
  store
    .get_student(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub guardian_id: Option<Uuid>,
}

/// `GET /students[?guardian_id=<id>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Student>>, ApiError>
where
  S: SchoolStore,
{
  let mut students = store
    .list_students(params.guardian_id)
    .await
    .map_err(ApiError::store)?;
  students.retain(|s| actor.allows(Operation::ViewStudent, student_target(s)));
  Ok(Json(students))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /students`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Json(body): Json<NewStudent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageStudents, Target::Any)?;
  let student = store.add_student(body).await.map_err(ApiError::store)?;
  tracing::info!(student_id = %student.student_id, roll = %student.roll_number, "student added");
  Ok((StatusCode::CREATED, Json(student)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /students/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError>
where
  S: SchoolStore,
{
  let student = load(store.as_ref(), id).await?;
  actor.authorize(Operation::ViewStudent, student_target(&student))?;
  Ok(Json(student))
}

// ─── Guardian link ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AssignBody {
  pub guardian_id: Option<Uuid>,
}

/// `PUT /students/:id/guardian`
pub async fn assign_guardian<S>(
  State(store): State<Arc<S>>,
  actor: CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<AssignBody>,
) -> Result<Json<Student>, ApiError>
where
  S: SchoolStore,
{
  actor.authorize(Operation::ManageGuardians, Target::Any)?;
  let student = store
    .assign_guardian(id, body.guardian_id)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(student_id = %id, guardian_id = ?body.guardian_id, "guardian reassigned");
  Ok(Json(student))
}
