//! The `SchoolStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `edutrack-store-sqlite`). Higher layers (`edutrack-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  Classify,
  fee::{FeeQuery, FeeRecord, FeeRecordInput, FeeStatus, FeeSummary},
  month::Month,
  school::{Guardian, NewGuardian, NewStudent, Student},
  topic::{NewTopic, Topic, TopicPatch},
};

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an EduTrack store backend.
///
/// Every fee write is followed, in the same transaction, by a recompute of
/// the owning student's guardian balance and active flag. If either
/// recompute fails the write is rolled back and a consistency error is
/// returned; a backend must never commit a record change without both.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SchoolStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  /// The date the backend stamps onto paid records. Callers deriving
  /// date-relative views (past-due fees, upcoming tests) use it too.
  fn today(&self) -> NaiveDate;

  // ── Guardians & students ──────────────────────────────────────────────

  fn add_guardian(
    &self,
    input: NewGuardian,
  ) -> impl Future<Output = Result<Guardian, Self::Error>> + Send + '_;

  fn get_guardian(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Guardian>, Self::Error>> + Send + '_;

  /// Register a student. Fails if the roll number is taken or the guardian
  /// does not exist.
  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  /// All students, optionally restricted to one guardian's children, ordered
  /// by grade, section, then roll number.
  fn list_students(
    &self,
    guardian_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Student>, Self::Error>> + Send + '_;

  /// Re-link a student to another guardian (or none). Both the previous and
  /// the new guardian's pending balances are recomputed.
  fn assign_guardian(
    &self,
    student_id: Uuid,
    guardian_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  // ── Fee ledger ────────────────────────────────────────────────────────

  /// Create the record for `(student, month)` or update the existing one.
  fn upsert_fee_record(
    &self,
    input: FeeRecordInput,
  ) -> impl Future<Output = Result<FeeRecord, Self::Error>> + Send + '_;

  /// Create a record; fails with a duplicate error if `(student, month)`
  /// already has one.
  fn create_fee_record(
    &self,
    input: FeeRecordInput,
  ) -> impl Future<Output = Result<FeeRecord, Self::Error>> + Send + '_;

  fn get_fee_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<FeeRecord>, Self::Error>> + Send + '_;

  /// Records matching `query`, newest month first.
  fn list_fee_records<'a>(
    &'a self,
    query: &'a FeeQuery,
  ) -> impl Future<Output = Result<Vec<FeeRecord>, Self::Error>> + Send + 'a;

  /// Move a record to `status`, deriving `paid_date` and running the
  /// recompute cascade.
  fn set_fee_status(
    &self,
    id: Uuid,
    status: FeeStatus,
  ) -> impl Future<Output = Result<FeeRecord, Self::Error>> + Send + '_;

  /// Apply [`SchoolStore::set_fee_status`] to each record in turn, with the
  /// full per-record cascade. The batch is all-or-nothing.
  fn bulk_set_fee_status(
    &self,
    ids: Vec<Uuid>,
    status: FeeStatus,
  ) -> impl Future<Output = Result<Vec<FeeRecord>, Self::Error>> + Send + '_;

  /// Delete a record and recompute the cascade for its student.
  fn delete_fee_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Recompute and store the pending balance of the student's guardian.
  /// Returns the new balance, or `None` when the student has no guardian.
  fn recompute_guardian_pending(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Option<Decimal>, Self::Error>> + Send + '_;

  /// Recompute and store the student's active flag; returns it.
  fn recompute_discontinuation(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn month_summary(
    &self,
    month: Month,
  ) -> impl Future<Output = Result<FeeSummary, Self::Error>> + Send + '_;

  // ── Roadmap ───────────────────────────────────────────────────────────

  /// Create a topic. A parent, if given, must exist and share the owner.
  fn create_topic(
    &self,
    input: NewTopic,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  fn get_topic(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Topic>, Self::Error>> + Send + '_;

  /// All topics, or one owner's, in sibling order.
  fn list_topics(
    &self,
    owner_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;

  /// Update a topic on behalf of `owner_id`. Reparenting under the topic
  /// itself or one of its descendants is rejected.
  fn update_topic(
    &self,
    id: Uuid,
    owner_id: Uuid,
    patch: TopicPatch,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  /// Delete a topic and its whole subtree on behalf of `owner_id`. Returns
  /// the number of topics removed.
  fn delete_topic(
    &self,
    id: Uuid,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Direct children ordered by `order`, ties broken by title.
  fn children_of(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;

  /// 0 for a root, else 1 + the parent's depth.
  fn topic_depth(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Pre-order descendants, excluding the topic itself.
  fn descendants(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;
}
