//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::NaiveDate;
use edutrack_core::{fee::Clock, policy::Role};
use edutrack_store_sqlite::SqliteStore;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
  api_router,
};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(store))
}

async fn app_on(today: NaiveDate) -> Router {
  let store = SqliteStore::open_in_memory()
    .await
    .unwrap()
    .with_clock(Clock::Fixed(today));
  api_router(Arc::new(store))
}

struct Caller {
  id:   Uuid,
  role: Role,
}

impl Caller {
  fn new(role: Role) -> Self { Self { id: Uuid::new_v4(), role } }

  fn with_id(id: Uuid, role: Role) -> Self { Self { id, role } }
}

async fn call(
  app: &Router,
  caller: Option<&Caller>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(c) = caller {
    builder = builder
      .header(ACTOR_ID_HEADER, c.id.to_string())
      .header(ACTOR_ROLE_HEADER, c.role.to_string());
  }
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn id_of(value: &Value, field: &str) -> Uuid {
  value[field].as_str().unwrap().parse().unwrap()
}

/// A guardian with one student, created by `admin`.
async fn family(app: &Router, admin: &Caller, roll: &str) -> (Uuid, Uuid) {
  let (status, guardian) =
    call(app, Some(admin), "POST", "/guardians", Some(json!({ "name": "G" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let guardian_id = id_of(&guardian, "guardian_id");

  let (status, student) = call(
    app,
    Some(admin),
    "POST",
    "/students",
    Some(json!({
      "name": "X",
      "roll_number": roll,
      "grade": "5",
      "section": "A",
      "guardian_id": guardian_id,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  (guardian_id, id_of(&student, "student_id"))
}

fn fee_body(student_id: Uuid, month: &str, amount: &str, status: &str) -> Value {
  json!({
    "student_id": student_id,
    "month": month,
    "amount": amount,
    "due_date": "2020-01-10",
    "status": status,
  })
}

// ─── Actor headers ────────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_actor_are_unauthorized() {
  let app = app().await;
  let (status, body) = call(&app, None, "GET", "/students", None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn only_admins_register_guardians() {
  let app = app().await;
  let teacher = Caller::new(Role::Teacher);
  let (status, _) =
    call(&app, Some(&teacher), "POST", "/guardians", Some(json!({ "name": "G" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Fee ledger ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn overdue_then_paid_updates_guardian_and_student() {
  let app = app().await;
  let admin = Caller::new(Role::Admin);
  let (guardian_id, student_id) = family(&app, &admin, "R1").await;

  let (status, jan) = call(
    &app,
    Some(&admin),
    "PUT",
    "/fees",
    Some(fee_body(student_id, "01/2026", "5000", "overdue")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(jan["month"], "01/2026");
  let (status, _) = call(
    &app,
    Some(&admin),
    "PUT",
    "/fees",
    Some(fee_body(student_id, "02/2026", "5000", "overdue")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (_, guardian) =
    call(&app, Some(&admin), "GET", &format!("/guardians/{guardian_id}"), None).await;
  assert_eq!(guardian["pending_amount"], "10000");
  let (_, student) =
    call(&app, Some(&admin), "GET", &format!("/students/{student_id}"), None).await;
  assert_eq!(student["is_active"], false);

  let jan_id = id_of(&jan, "fee_id");
  let (status, paid) = call(
    &app,
    Some(&admin),
    "POST",
    &format!("/fees/{jan_id}/status"),
    Some(json!({ "status": "paid" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(paid["paid_date"].is_string());
  assert_eq!(paid["is_past_due"], false);

  let (_, guardian) =
    call(&app, Some(&admin), "GET", &format!("/guardians/{guardian_id}"), None).await;
  assert_eq!(guardian["pending_amount"], "5000");
  let (_, student) =
    call(&app, Some(&admin), "GET", &format!("/students/{student_id}"), None).await;
  assert_eq!(student["is_active"], true);
}

#[tokio::test]
async fn duplicate_create_is_a_conflict() {
  let app = app().await;
  let admin = Caller::new(Role::Admin);
  let (_, student_id) = family(&app, &admin, "R1").await;
  let body = fee_body(student_id, "03/2026", "100", "unpaid");

  let (status, _) = call(&app, Some(&admin), "POST", "/fees", Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, err) = call(&app, Some(&admin), "POST", "/fees", Some(body)).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(err["error"].as_str().unwrap().contains("03/2026"));
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
  let app = app().await;
  let admin = Caller::new(Role::Admin);
  let (_, student_id) = family(&app, &admin, "R1").await;

  let (status, _) = call(
    &app,
    Some(&admin),
    "PUT",
    "/fees",
    Some(fee_body(student_id, "03/2026", "-5", "unpaid")),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(&app, Some(&admin), "GET", "/fees/summary?month=2026-03", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_amount_is_rejected_and_the_store_keeps_serving() {
  let app = app().await;
  let admin = Caller::new(Role::Admin);
  let (guardian_id, student_id) = family(&app, &admin, "R1").await;

  for month in ["01/2026", "02/2026"] {
    let (status, err) = call(
      &app,
      Some(&admin),
      "PUT",
      "/fees",
      Some(fee_body(student_id, month, "50000000000000000000000000000", "unpaid")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"].as_str().unwrap().contains("exceeds"));
  }

  let (status, _) = call(
    &app,
    Some(&admin),
    "PUT",
    "/fees",
    Some(fee_body(student_id, "03/2026", "12.345", "unpaid")),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, guardian) =
    call(&app, Some(&admin), "GET", &format!("/guardians/{guardian_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(guardian["pending_amount"], "0");
}

#[tokio::test]
async fn fee_dates_follow_the_store_clock() {
  let today = NaiveDate::from_ymd_opt(2020, 1, 5).unwrap();
  let app = app_on(today).await;
  let admin = Caller::new(Role::Admin);
  let (_, student_id) = family(&app, &admin, "R1").await;

  // Due 2020-01-10, five days after the store's today.
  let (status, rec) = call(
    &app,
    Some(&admin),
    "PUT",
    "/fees",
    Some(fee_body(student_id, "01/2020", "100", "unpaid")),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(rec["is_past_due"], false);

  let fee_id = id_of(&rec, "fee_id");
  let (_, paid) = call(
    &app,
    Some(&admin),
    "POST",
    &format!("/fees/{fee_id}/status"),
    Some(json!({ "status": "paid" })),
  )
  .await;
  assert_eq!(paid["paid_date"], "2020-01-05");
}

#[tokio::test]
async fn fees_are_visible_to_the_family_only() {
  let app = app().await;
  let admin = Caller::new(Role::Admin);
  let (guardian_id, student_id) = family(&app, &admin, "R1").await;
  call(
    &app,
    Some(&admin),
    "PUT",
    "/fees",
    Some(fee_body(student_id, "01/2026", "100", "unpaid")),
  )
  .await;

  let uri = format!("/fees?student_id={student_id}");
  let parent = Caller::with_id(guardian_id, Role::Parent);
  let (status, fees) = call(&app, Some(&parent), "GET", &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fees.as_array().unwrap().len(), 1);
  assert_eq!(fees[0]["is_past_due"], true);

  let student = Caller::with_id(student_id, Role::Student);
  let (status, _) = call(&app, Some(&student), "GET", &uri, None).await;
  assert_eq!(status, StatusCode::OK);

  let stranger = Caller::new(Role::Parent);
  let (status, _) = call(&app, Some(&stranger), "GET", &uri, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&app, Some(&parent), "GET", "/fees", None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bulk_status_and_summary() {
  let app = app().await;
  let admin = Caller::new(Role::Admin);
  let (_, a) = family(&app, &admin, "R1").await;
  let (_, b) = family(&app, &admin, "R2").await;

  let mut ids = Vec::new();
  for student_id in [a, b] {
    let (_, rec) = call(
      &app,
      Some(&admin),
      "PUT",
      "/fees",
      Some(fee_body(student_id, "01/2026", "250.50", "unpaid")),
    )
    .await;
    ids.push(id_of(&rec, "fee_id"));
  }

  let (status, updated) = call(
    &app,
    Some(&admin),
    "POST",
    "/fees/bulk-status",
    Some(json!({ "fee_ids": ids, "status": "paid" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated.as_array().unwrap().len(), 2);

  let (status, summary) =
    call(&app, Some(&admin), "GET", "/fees/summary?month=01/2026", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(summary["paid_count"], 2);
  let income: Decimal = summary["total_income"].as_str().unwrap().parse().unwrap();
  assert_eq!(income, Decimal::new(501, 0));
  assert_eq!(summary["outstanding_count"], 0);
}

#[tokio::test]
async fn deleting_a_fee_record() {
  let app = app().await;
  let admin = Caller::new(Role::Admin);
  let (guardian_id, student_id) = family(&app, &admin, "R1").await;
  let (_, rec) = call(
    &app,
    Some(&admin),
    "PUT",
    "/fees",
    Some(fee_body(student_id, "01/2026", "100", "unpaid")),
  )
  .await;
  let fee_id = id_of(&rec, "fee_id");

  let (status, _) = call(&app, Some(&admin), "DELETE", &format!("/fees/{fee_id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&app, Some(&admin), "GET", &format!("/fees/{fee_id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (_, guardian) =
    call(&app, Some(&admin), "GET", &format!("/guardians/{guardian_id}"), None).await;
  assert_eq!(guardian["pending_amount"], "0");
}

// ─── Roadmap ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn teachers_build_and_query_a_roadmap() {
  let app = app().await;
  let teacher = Caller::new(Role::Teacher);

  let (status, root) =
    call(&app, Some(&teacher), "POST", "/topics", Some(json!({ "title": "Root" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let root_id = id_of(&root, "topic_id");
  assert_eq!(root["owner_id"], teacher.id.to_string());

  let (_, child) = call(
    &app,
    Some(&teacher),
    "POST",
    "/topics",
    Some(json!({ "title": "Child", "parent_id": root_id, "status": "completed" })),
  )
  .await;
  let child_id = id_of(&child, "topic_id");
  let (_, grandchild) = call(
    &app,
    Some(&teacher),
    "POST",
    "/topics",
    Some(json!({ "title": "Grandchild", "parent_id": child_id })),
  )
  .await;
  let grandchild_id = id_of(&grandchild, "topic_id");

  let (_, depth) = call(
    &app,
    Some(&teacher),
    "GET",
    &format!("/topics/{grandchild_id}/depth"),
    None,
  )
  .await;
  assert_eq!(depth["depth"], 2);

  let (_, desc) = call(
    &app,
    Some(&teacher),
    "GET",
    &format!("/topics/{root_id}/descendants"),
    None,
  )
  .await;
  let titles: Vec<&str> = desc
    .as_array()
    .unwrap()
    .iter()
    .map(|t| t["title"].as_str().unwrap())
    .collect();
  assert_eq!(titles, ["Child", "Grandchild"]);

  let student = Caller::new(Role::Student);
  let (status, tree) = call(
    &app,
    Some(&student),
    "GET",
    &format!("/roadmap/tree?owner_id={}", teacher.id),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(tree.as_array().unwrap().len(), 1);
  assert_eq!(tree[0]["name"], "Root");
  assert_eq!(tree[0]["children"][0]["children"][0]["name"], "Grandchild");

  let (_, progress) = call(
    &app,
    Some(&student),
    "GET",
    &format!("/roadmap/progress?owner_id={}", teacher.id),
    None,
  )
  .await;
  assert_eq!(progress["total"], 3);
  assert_eq!(progress["completed"], 1);
  assert_eq!(progress["percentage"], 33.3);
}

#[tokio::test]
async fn topics_are_edited_by_their_owner_only() {
  let app = app().await;
  let owner = Caller::new(Role::Teacher);
  let (_, topic) =
    call(&app, Some(&owner), "POST", "/topics", Some(json!({ "title": "Algebra" }))).await;
  let topic_id = id_of(&topic, "topic_id");
  let uri = format!("/topics/{topic_id}");

  let other = Caller::new(Role::Teacher);
  let (status, _) =
    call(&app, Some(&other), "PATCH", &uri, Some(json!({ "title": "Mine" }))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&app, Some(&other), "DELETE", &uri, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, updated) = call(
    &app,
    Some(&owner),
    "PATCH",
    &uri,
    Some(json!({ "status": "in_progress", "resources": "Chapter 2" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["status"], "in_progress");
  assert_eq!(updated["resources"], "Chapter 2");
  assert_eq!(updated["title"], "Algebra");

  let (status, deleted) = call(&app, Some(&owner), "DELETE", &uri, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(deleted["deleted"], 1);
}

#[tokio::test]
async fn reparenting_into_own_subtree_is_rejected() {
  let app = app().await;
  let owner = Caller::new(Role::Teacher);
  let (_, root) =
    call(&app, Some(&owner), "POST", "/topics", Some(json!({ "title": "Root" }))).await;
  let root_id = id_of(&root, "topic_id");
  let (_, child) = call(
    &app,
    Some(&owner),
    "POST",
    "/topics",
    Some(json!({ "title": "Child", "parent_id": root_id })),
  )
  .await;
  let child_id = id_of(&child, "topic_id");

  let (status, _) = call(
    &app,
    Some(&owner),
    "PATCH",
    &format!("/topics/{root_id}"),
    Some(json!({ "parent_id": child_id })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}
