//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates are `YYYY-MM-DD`, amounts are
//! decimal strings (never floats), UUIDs are hyphenated lowercase strings.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use edutrack_core::{
  fee::{FeeRecord, FeeStatus},
  month::Month,
  school::{Guardian, Student},
  topic::{ScheduledTest, Topic, TopicStatus},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const GUARDIAN_COLUMNS: &str = "guardian_id, name, pending_amount, created_at";

/// Raw strings read directly from a `guardians` row.
pub struct RawGuardian {
  pub guardian_id:    String,
  pub name:           String,
  pub pending_amount: String,
  pub created_at:     String,
}

impl RawGuardian {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      guardian_id:    row.get(0)?,
      name:           row.get(1)?,
      pending_amount: row.get(2)?,
      created_at:     row.get(3)?,
    })
  }

  pub fn into_guardian(self) -> Result<Guardian> {
    Ok(Guardian {
      guardian_id:    decode_uuid(&self.guardian_id)?,
      name:           self.name,
      pending_amount: decode_decimal(&self.pending_amount)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const STUDENT_COLUMNS: &str = "student_id, name, roll_number, grade, section, \
                                   guardian_id, is_active, created_at, updated_at";

/// Raw values read directly from a `students` row.
pub struct RawStudent {
  pub student_id:  String,
  pub name:        String,
  pub roll_number: String,
  pub grade:       String,
  pub section:     String,
  pub guardian_id: Option<String>,
  pub is_active:   bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:  row.get(0)?,
      name:        row.get(1)?,
      roll_number: row.get(2)?,
      grade:       row.get(3)?,
      section:     row.get(4)?,
      guardian_id: row.get(5)?,
      is_active:   row.get(6)?,
      created_at:  row.get(7)?,
      updated_at:  row.get(8)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:  decode_uuid(&self.student_id)?,
      name:        self.name,
      roll_number: self.roll_number,
      grade:       self.grade,
      section:     self.section,
      guardian_id: self.guardian_id.as_deref().map(decode_uuid).transpose()?,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const FEE_COLUMNS: &str = "f.fee_id, f.student_id, f.period, f.amount, f.status, \
                               f.due_date, f.paid_date, f.remarks, f.created_at, f.updated_at";

/// Raw strings read directly from a `fee_records` row (aliased `f`).
pub struct RawFeeRecord {
  pub fee_id:     String,
  pub student_id: String,
  pub period:     String,
  pub amount:     String,
  pub status:     String,
  pub due_date:   String,
  pub paid_date:  Option<String>,
  pub remarks:    String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawFeeRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fee_id:     row.get(0)?,
      student_id: row.get(1)?,
      period:     row.get(2)?,
      amount:     row.get(3)?,
      status:     row.get(4)?,
      due_date:   row.get(5)?,
      paid_date:  row.get(6)?,
      remarks:    row.get(7)?,
      created_at: row.get(8)?,
      updated_at: row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<FeeRecord> {
    Ok(FeeRecord {
      fee_id:     decode_uuid(&self.fee_id)?,
      student_id: decode_uuid(&self.student_id)?,
      month:      Month::from_storage_key(&self.period)?,
      amount:     decode_decimal(&self.amount)?,
      status:     FeeStatus::parse(&self.status)?,
      due_date:   decode_date(&self.due_date)?,
      paid_date:  self.paid_date.as_deref().map(decode_date).transpose()?,
      remarks:    self.remarks,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const TOPIC_COLUMNS: &str = "topic_id, owner_id, parent_id, title, description, sort_order, \
                                 status, subject, grade, estimated_hours, test_date, test_title, \
                                 test_duration, created_at, updated_at, resources";

/// Raw values read directly from a `topics` row.
pub struct RawTopic {
  pub topic_id:        String,
  pub owner_id:        String,
  pub parent_id:       Option<String>,
  pub title:           String,
  pub description:     String,
  pub resources:       String,
  pub sort_order:      i32,
  pub status:          String,
  pub subject:         String,
  pub grade:           String,
  pub estimated_hours: Option<u32>,
  pub test_date:       Option<String>,
  pub test_title:      String,
  pub test_duration:   Option<u32>,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawTopic {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      topic_id:        row.get(0)?,
      owner_id:        row.get(1)?,
      parent_id:       row.get(2)?,
      title:           row.get(3)?,
      description:     row.get(4)?,
      resources:       row.get(15)?,
      sort_order:      row.get(5)?,
      status:          row.get(6)?,
      subject:         row.get(7)?,
      grade:           row.get(8)?,
      estimated_hours: row.get(9)?,
      test_date:       row.get(10)?,
      test_title:      row.get(11)?,
      test_duration:   row.get(12)?,
      created_at:      row.get(13)?,
      updated_at:      row.get(14)?,
    })
  }

  pub fn into_topic(self) -> Result<Topic> {
    let test = self
      .test_date
      .as_deref()
      .map(decode_date)
      .transpose()?
      .map(|date| ScheduledTest {
        date,
        title: self.test_title,
        duration_minutes: self.test_duration,
      });

    Ok(Topic {
      topic_id: decode_uuid(&self.topic_id)?,
      owner_id: decode_uuid(&self.owner_id)?,
      parent_id: self.parent_id.as_deref().map(decode_uuid).transpose()?,
      title: self.title,
      description: self.description,
      resources: self.resources,
      order: self.sort_order,
      status: TopicStatus::parse(&self.status)?,
      subject: self.subject,
      grade: self.grade,
      estimated_hours: self.estimated_hours,
      test,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}
