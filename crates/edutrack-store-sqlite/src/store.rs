//! [`SqliteStore`], the SQLite implementation of [`SchoolStore`].

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use edutrack_core::{
  fee::{Clock, FeeQuery, FeeRecord, FeeRecordInput, FeeStatus, FeeSummary},
  month::Month,
  school::{Guardian, NewGuardian, NewStudent, Student},
  store::SchoolStore,
  topic::{NewTopic, Topic, TopicPatch},
};

use crate::{
  Error, Result,
  ledger::{self, WriteMode},
  roadmap,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An EduTrack store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  clock: Clock,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, clock: Clock::System };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, clock: Clock::System };
    store.init_schema().await?;
    Ok(store)
  }

  /// Use `clock` for paid-date stamping.
  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection outside any explicit transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Execute a single statement outside the ledger, for tests that need to
  /// put the database into states the API refuses to produce.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: String) -> Result<usize> {
    self.read(move |conn| Ok(conn.execute(&sql, [])?)).await
  }

  /// Run `f` inside a transaction that commits only if `f` succeeds.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(in_transaction(conn, f))).await?
  }
}

fn in_transaction<T>(
  conn: &mut rusqlite::Connection,
  f: impl FnOnce(&rusqlite::Connection) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction()?;
  // Dropping `tx` on the error path rolls it back.
  let out = f(&tx)?;
  tx.commit()?;
  Ok(out)
}

// ─── SchoolStore impl ────────────────────────────────────────────────────────

impl SchoolStore for SqliteStore {
  type Error = Error;

  fn today(&self) -> NaiveDate { self.clock.today() }

  // ── Guardians & students ──────────────────────────────────────────────────

  async fn add_guardian(&self, input: NewGuardian) -> Result<Guardian> {
    self.write(move |conn| ledger::add_guardian(conn, input)).await
  }

  async fn get_guardian(&self, id: Uuid) -> Result<Option<Guardian>> {
    self.read(move |conn| ledger::get_guardian(conn, id)).await
  }

  async fn add_student(&self, input: NewStudent) -> Result<Student> {
    self.write(move |conn| ledger::add_student(conn, input)).await
  }

  async fn get_student(&self, id: Uuid) -> Result<Option<Student>> {
    self.read(move |conn| ledger::get_student(conn, id)).await
  }

  async fn list_students(&self, guardian_id: Option<Uuid>) -> Result<Vec<Student>> {
    self.read(move |conn| ledger::list_students(conn, guardian_id)).await
  }

  async fn assign_guardian(
    &self,
    student_id: Uuid,
    guardian_id: Option<Uuid>,
  ) -> Result<Student> {
    self
      .write(move |conn| ledger::assign_guardian(conn, student_id, guardian_id))
      .await
  }

  // ── Fee ledger ────────────────────────────────────────────────────────────

  async fn upsert_fee_record(&self, input: FeeRecordInput) -> Result<FeeRecord> {
    let today = self.today();
    let record = self
      .write(move |conn| ledger::write_fee_record(conn, input, WriteMode::Upsert, today))
      .await?;
    tracing::info!(fee_id = %record.fee_id, month = %record.month, status = %record.status, "fee record saved");
    Ok(record)
  }

  async fn create_fee_record(&self, input: FeeRecordInput) -> Result<FeeRecord> {
    let today = self.today();
    let record = self
      .write(move |conn| ledger::write_fee_record(conn, input, WriteMode::CreateOnly, today))
      .await?;
    tracing::info!(fee_id = %record.fee_id, month = %record.month, status = %record.status, "fee record created");
    Ok(record)
  }

  async fn get_fee_record(&self, id: Uuid) -> Result<Option<FeeRecord>> {
    self.read(move |conn| ledger::get_fee_record(conn, id)).await
  }

  async fn list_fee_records<'a>(&'a self, query: &'a FeeQuery) -> Result<Vec<FeeRecord>> {
    let query = query.clone();
    self.read(move |conn| ledger::list_fee_records(conn, &query)).await
  }

  async fn set_fee_status(&self, id: Uuid, status: FeeStatus) -> Result<FeeRecord> {
    let today = self.today();
    let record = self
      .write(move |conn| ledger::set_fee_status(conn, id, status, today))
      .await?;
    tracing::info!(fee_id = %id, %status, "fee status updated");
    Ok(record)
  }

  async fn bulk_set_fee_status(
    &self,
    ids: Vec<Uuid>,
    status: FeeStatus,
  ) -> Result<Vec<FeeRecord>> {
    let today = self.today();
    let records = self
      .write(move |conn| ledger::bulk_set_fee_status(conn, &ids, status, today))
      .await?;
    tracing::info!(count = records.len(), %status, "bulk fee status updated");
    Ok(records)
  }

  async fn delete_fee_record(&self, id: Uuid) -> Result<()> {
    self.write(move |conn| ledger::delete_fee_record(conn, id)).await?;
    tracing::info!(fee_id = %id, "fee record deleted");
    Ok(())
  }

  async fn recompute_guardian_pending(&self, student_id: Uuid) -> Result<Option<Decimal>> {
    self
      .write(move |conn| ledger::recompute_guardian_pending(conn, student_id))
      .await
  }

  async fn recompute_discontinuation(&self, student_id: Uuid) -> Result<bool> {
    self
      .write(move |conn| ledger::recompute_discontinuation(conn, student_id))
      .await
  }

  async fn month_summary(&self, month: Month) -> Result<FeeSummary> {
    self.read(move |conn| ledger::month_summary(conn, month)).await
  }

  // ── Roadmap ───────────────────────────────────────────────────────────────

  async fn create_topic(&self, input: NewTopic) -> Result<Topic> {
    self.write(move |conn| roadmap::create_topic(conn, input)).await
  }

  async fn get_topic(&self, id: Uuid) -> Result<Option<Topic>> {
    self.read(move |conn| roadmap::get_topic(conn, id)).await
  }

  async fn list_topics(&self, owner_id: Option<Uuid>) -> Result<Vec<Topic>> {
    self.read(move |conn| roadmap::list_topics(conn, owner_id)).await
  }

  async fn update_topic(&self, id: Uuid, owner_id: Uuid, patch: TopicPatch) -> Result<Topic> {
    self
      .write(move |conn| roadmap::update_topic(conn, id, owner_id, patch))
      .await
  }

  async fn delete_topic(&self, id: Uuid, owner_id: Uuid) -> Result<usize> {
    let removed = self
      .write(move |conn| roadmap::delete_topic(conn, id, owner_id))
      .await?;
    tracing::info!(topic_id = %id, removed, "topic subtree deleted");
    Ok(removed)
  }

  async fn children_of(&self, id: Uuid) -> Result<Vec<Topic>> {
    self.read(move |conn| roadmap::children_of(conn, id)).await
  }

  async fn topic_depth(&self, id: Uuid) -> Result<usize> {
    self.read(move |conn| roadmap::topic_depth(conn, id)).await
  }

  async fn descendants(&self, id: Uuid) -> Result<Vec<Topic>> {
    self.read(move |conn| roadmap::descendants(conn, id)).await
  }
}
