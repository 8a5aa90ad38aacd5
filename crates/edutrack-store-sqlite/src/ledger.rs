//! Guardians, students and the fee ledger.
//!
//! Everything here is synchronous and runs against a connection borrowed
//! inside a `tokio_rusqlite` call, usually through a transaction. A fee write
//! and its recompute cascade therefore commit or roll back together.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use edutrack_core::{
  Error as CoreError,
  fee::{
    self, FeeQuery, FeeRecord, FeeRecordInput, FeeStatus, FeeSummary, derive_paid_date,
    is_active_with, pending_total,
  },
  month::Month,
  school::{Guardian, NewGuardian, NewStudent, Student},
};
use rusqlite::{Connection, OptionalExtension as _};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    FEE_COLUMNS, GUARDIAN_COLUMNS, RawFeeRecord, RawGuardian, RawStudent, STUDENT_COLUMNS,
    decode_decimal, encode_date, encode_decimal, encode_dt, encode_uuid,
  },
};

// ─── Guardians ───────────────────────────────────────────────────────────────

pub fn add_guardian(conn: &Connection, input: NewGuardian) -> Result<Guardian> {
  let guardian = Guardian {
    guardian_id:    Uuid::new_v4(),
    name:           input.name,
    pending_amount: Decimal::ZERO,
    created_at:     Utc::now(),
  };

  conn.execute(
    "INSERT INTO guardians (guardian_id, name, pending_amount, created_at)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![
      encode_uuid(guardian.guardian_id),
      guardian.name,
      encode_decimal(guardian.pending_amount),
      encode_dt(guardian.created_at),
    ],
  )?;

  Ok(guardian)
}

pub fn get_guardian(conn: &Connection, id: Uuid) -> Result<Option<Guardian>> {
  conn
    .query_row(
      &format!("SELECT {GUARDIAN_COLUMNS} FROM guardians WHERE guardian_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawGuardian::from_row,
    )
    .optional()?
    .map(RawGuardian::into_guardian)
    .transpose()
}

fn guardian_exists(conn: &Connection, id: Uuid) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM guardians WHERE guardian_id = ?1",
        rusqlite::params![encode_uuid(id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn require_guardian(conn: &Connection, id: Uuid) -> Result<()> {
  if guardian_exists(conn, id)? {
    Ok(())
  } else {
    Err(CoreError::GuardianNotFound(id).into())
  }
}

// ─── Students ────────────────────────────────────────────────────────────────

pub fn add_student(conn: &Connection, input: NewStudent) -> Result<Student> {
  if let Some(guardian_id) = input.guardian_id {
    require_guardian(conn, guardian_id)?;
  }

  let taken = conn
    .query_row(
      "SELECT 1 FROM students WHERE roll_number = ?1",
      rusqlite::params![input.roll_number],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if taken {
    return Err(CoreError::DuplicateRollNumber(input.roll_number).into());
  }

  let now = Utc::now();
  let student = Student {
    student_id:  Uuid::new_v4(),
    name:        input.name,
    roll_number: input.roll_number,
    grade:       input.grade,
    section:     input.section,
    guardian_id: input.guardian_id,
    is_active:   true,
    created_at:  now,
    updated_at:  now,
  };

  conn.execute(
    "INSERT INTO students (
       student_id, name, roll_number, grade, section,
       guardian_id, is_active, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      encode_uuid(student.student_id),
      student.name,
      student.roll_number,
      student.grade,
      student.section,
      student.guardian_id.map(encode_uuid),
      student.is_active,
      encode_dt(student.created_at),
      encode_dt(student.updated_at),
    ],
  )?;

  Ok(student)
}

pub fn get_student(conn: &Connection, id: Uuid) -> Result<Option<Student>> {
  conn
    .query_row(
      &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE student_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawStudent::from_row,
    )
    .optional()?
    .map(RawStudent::into_student)
    .transpose()
}

fn require_student(conn: &Connection, id: Uuid) -> Result<Student> {
  get_student(conn, id)?.ok_or_else(|| CoreError::StudentNotFound(id).into())
}

pub fn list_students(conn: &Connection, guardian_id: Option<Uuid>) -> Result<Vec<Student>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {STUDENT_COLUMNS} FROM students
     WHERE (?1 IS NULL OR guardian_id = ?1)
     ORDER BY grade, section, roll_number"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![guardian_id.map(encode_uuid)], RawStudent::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawStudent::into_student).collect()
}

/// Move a student to `guardian_id` and rebalance both guardians.
pub fn assign_guardian(
  conn: &Connection,
  student_id: Uuid,
  guardian_id: Option<Uuid>,
) -> Result<Student> {
  let mut student = require_student(conn, student_id)?;
  if let Some(id) = guardian_id {
    require_guardian(conn, id)?;
  }

  let previous = student.guardian_id;
  student.guardian_id = guardian_id;
  student.updated_at = Utc::now();

  conn.execute(
    "UPDATE students SET guardian_id = ?2, updated_at = ?3 WHERE student_id = ?1",
    rusqlite::params![
      encode_uuid(student_id),
      guardian_id.map(encode_uuid),
      encode_dt(student.updated_at),
    ],
  )?;

  let affected: HashSet<Uuid> = previous.into_iter().chain(guardian_id).collect();
  for id in affected {
    recompute_guardian(conn, id)
      .map_err(|e| consistency(student_id, "guardian pending amount", e))?;
  }

  Ok(student)
}

// ─── Fee records ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
  /// Update the `(student, month)` record in place if one exists.
  Upsert,
  /// Reject the write if the `(student, month)` record exists.
  CreateOnly,
}

pub fn get_fee_record(conn: &Connection, id: Uuid) -> Result<Option<FeeRecord>> {
  conn
    .query_row(
      &format!("SELECT {FEE_COLUMNS} FROM fee_records f WHERE f.fee_id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawFeeRecord::from_row,
    )
    .optional()?
    .map(RawFeeRecord::into_record)
    .transpose()
}

fn require_fee_record(conn: &Connection, id: Uuid) -> Result<FeeRecord> {
  get_fee_record(conn, id)?.ok_or_else(|| CoreError::FeeRecordNotFound(id).into())
}

fn find_fee_record(conn: &Connection, student_id: Uuid, month: Month) -> Result<Option<FeeRecord>> {
  conn
    .query_row(
      &format!(
        "SELECT {FEE_COLUMNS} FROM fee_records f WHERE f.student_id = ?1 AND f.period = ?2"
      ),
      rusqlite::params![encode_uuid(student_id), month.storage_key()],
      RawFeeRecord::from_row,
    )
    .optional()?
    .map(RawFeeRecord::into_record)
    .transpose()
}

pub fn list_fee_records(conn: &Connection, query: &FeeQuery) -> Result<Vec<FeeRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {FEE_COLUMNS} FROM fee_records f
     JOIN students s ON s.student_id = f.student_id
     WHERE (?1 IS NULL OR f.student_id = ?1)
       AND (?2 IS NULL OR f.period = ?2)
       AND (?3 IS NULL OR f.status = ?3)
     ORDER BY f.period DESC, s.roll_number"
  ))?;
  let raws = stmt
    .query_map(
      rusqlite::params![
        query.student_id.map(encode_uuid),
        query.month.map(|m| m.storage_key()),
        query.status.map(FeeStatus::as_str),
      ],
      RawFeeRecord::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawFeeRecord::into_record).collect()
}

/// Create or update the record for the input's `(student, month)`, then run
/// the recompute cascade.
pub fn write_fee_record(
  conn: &Connection,
  input: FeeRecordInput,
  mode: WriteMode,
  today: NaiveDate,
) -> Result<FeeRecord> {
  input.validate()?;
  require_student(conn, input.student_id)?;

  let now = Utc::now();
  let record = match find_fee_record(conn, input.student_id, input.month)? {
    Some(_) if mode == WriteMode::CreateOnly => {
      return Err(
        CoreError::DuplicateFeeRecord {
          student_id: input.student_id,
          month:      input.month,
        }
        .into(),
      );
    }
    Some(mut record) => {
      record.paid_date = derive_paid_date(input.status, record.paid_date, today);
      record.amount = input.amount;
      record.status = input.status;
      record.due_date = input.due_date;
      record.remarks = input.remarks;
      record.updated_at = now;
      update_fee_row(conn, &record)?;
      record
    }
    None => {
      let record = FeeRecord {
        fee_id:     Uuid::new_v4(),
        student_id: input.student_id,
        month:      input.month,
        amount:     input.amount,
        status:     input.status,
        due_date:   input.due_date,
        paid_date:  derive_paid_date(input.status, None, today),
        remarks:    input.remarks,
        created_at: now,
        updated_at: now,
      };
      conn.execute(
        "INSERT INTO fee_records (
           fee_id, student_id, period, amount, status,
           due_date, paid_date, remarks, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
          encode_uuid(record.fee_id),
          encode_uuid(record.student_id),
          record.month.storage_key(),
          encode_decimal(record.amount),
          record.status.as_str(),
          encode_date(record.due_date),
          record.paid_date.map(encode_date),
          record.remarks,
          encode_dt(record.created_at),
          encode_dt(record.updated_at),
        ],
      )?;
      record
    }
  };

  recompute_cascade(conn, record.student_id)?;
  Ok(record)
}

fn update_fee_row(conn: &Connection, record: &FeeRecord) -> Result<()> {
  conn.execute(
    "UPDATE fee_records
     SET amount = ?2, status = ?3, due_date = ?4, paid_date = ?5,
         remarks = ?6, updated_at = ?7
     WHERE fee_id = ?1",
    rusqlite::params![
      encode_uuid(record.fee_id),
      encode_decimal(record.amount),
      record.status.as_str(),
      encode_date(record.due_date),
      record.paid_date.map(encode_date),
      record.remarks,
      encode_dt(record.updated_at),
    ],
  )?;
  Ok(())
}

pub fn set_fee_status(
  conn: &Connection,
  id: Uuid,
  status: FeeStatus,
  today: NaiveDate,
) -> Result<FeeRecord> {
  let mut record = require_fee_record(conn, id)?;
  record.paid_date = derive_paid_date(status, record.paid_date, today);
  record.status = status;
  record.updated_at = Utc::now();
  update_fee_row(conn, &record)?;

  recompute_cascade(conn, record.student_id)?;
  Ok(record)
}

/// Each id goes through [`set_fee_status`] in order. The caller's
/// transaction makes the batch all-or-nothing.
pub fn bulk_set_fee_status(
  conn: &Connection,
  ids: &[Uuid],
  status: FeeStatus,
  today: NaiveDate,
) -> Result<Vec<FeeRecord>> {
  ids
    .iter()
    .map(|id| set_fee_status(conn, *id, status, today))
    .collect()
}

pub fn delete_fee_record(conn: &Connection, id: Uuid) -> Result<()> {
  let record = require_fee_record(conn, id)?;
  conn.execute(
    "DELETE FROM fee_records WHERE fee_id = ?1",
    rusqlite::params![encode_uuid(id)],
  )?;
  recompute_cascade(conn, record.student_id)
}

pub fn month_summary(conn: &Connection, month: Month) -> Result<FeeSummary> {
  let query = FeeQuery { month: Some(month), ..FeeQuery::default() };
  let records = list_fee_records(conn, &query)?;
  Ok(FeeSummary::from_records(month, &records)?)
}

// ─── Recompute ───────────────────────────────────────────────────────────────

/// Refresh both caches derived from a student's fee records. Any failure is
/// reported as a consistency error so the surrounding write rolls back.
pub fn recompute_cascade(conn: &Connection, student_id: Uuid) -> Result<()> {
  recompute_guardian_pending(conn, student_id)
    .map_err(|e| consistency(student_id, "guardian pending amount", e))?;
  recompute_discontinuation(conn, student_id)
    .map_err(|e| consistency(student_id, "active flag", e))?;
  Ok(())
}

fn consistency(student_id: Uuid, step: &'static str, err: Error) -> Error {
  match err {
    Error::Core(CoreError::Consistency { .. }) => err,
    other => CoreError::Consistency { student_id, step, reason: other.to_string() }.into(),
  }
}

/// Store the outstanding total of the student's guardian. `None` when the
/// student has no guardian.
pub fn recompute_guardian_pending(conn: &Connection, student_id: Uuid) -> Result<Option<Decimal>> {
  let student = require_student(conn, student_id)?;
  match student.guardian_id {
    Some(guardian_id) => recompute_guardian(conn, guardian_id),
    None => Ok(None),
  }
}

/// Sum outstanding amounts over every record of every student linked to
/// `guardian_id`. A guardian row that no longer exists is skipped.
fn recompute_guardian(conn: &Connection, guardian_id: Uuid) -> Result<Option<Decimal>> {
  if !guardian_exists(conn, guardian_id)? {
    return Ok(None);
  }

  let mut stmt = conn.prepare(
    "SELECT f.status, f.amount FROM fee_records f
     JOIN students s ON s.student_id = f.student_id
     WHERE s.guardian_id = ?1",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![encode_uuid(guardian_id)], |row| {
      Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let amounts = rows
    .into_iter()
    .map(|(status, amount)| Ok((FeeStatus::parse(&status)?, decode_decimal(&amount)?)))
    .collect::<Result<Vec<_>>>()?;
  let pending = pending_total(amounts.iter().map(|(status, amount)| (*status, amount)))?;

  conn.execute(
    "UPDATE guardians SET pending_amount = ?2 WHERE guardian_id = ?1",
    rusqlite::params![encode_uuid(guardian_id), encode_decimal(pending)],
  )?;
  tracing::debug!(%guardian_id, %pending, "recomputed guardian pending amount");

  Ok(Some(pending))
}

/// Store and return the student's active flag.
pub fn recompute_discontinuation(conn: &Connection, student_id: Uuid) -> Result<bool> {
  let overdue: i64 = conn.query_row(
    "SELECT COUNT(*) FROM fee_records WHERE student_id = ?1 AND status = ?2",
    rusqlite::params![encode_uuid(student_id), FeeStatus::Overdue.as_str()],
    |row| row.get(0),
  )?;
  let is_active = is_active_with(usize::try_from(overdue).unwrap_or(usize::MAX));

  let updated = conn.execute(
    "UPDATE students SET is_active = ?2 WHERE student_id = ?1",
    rusqlite::params![encode_uuid(student_id), is_active],
  )?;
  if updated == 0 {
    return Err(CoreError::StudentNotFound(student_id).into());
  }
  tracing::debug!(
    %student_id,
    overdue,
    threshold = fee::DISCONTINUATION_THRESHOLD,
    is_active,
    "recomputed active flag"
  );

  Ok(is_active)
}
