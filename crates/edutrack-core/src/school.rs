//! Students and guardians.
//!
//! Both carry one field that callers never write: the guardian's
//! `pending_amount` and the student's `is_active`. They are caches over the
//! fee record set, maintained only by the ledger recompute steps.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A parent or guardian responsible for one or more students' fees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guardian {
  pub guardian_id:    Uuid,
  pub name:           String,
  /// Outstanding (unpaid + overdue) fees across all of this guardian's
  /// students.
  pub pending_amount: Decimal,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGuardian {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
  pub student_id:  Uuid,
  pub name:        String,
  pub roll_number: String,
  pub grade:       String,
  pub section:     String,
  pub guardian_id: Option<Uuid>,
  /// False once two or more fee records are overdue.
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::SchoolStore::add_student`]. New students start
/// active; the flag is only ever changed by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
  pub name:        String,
  pub roll_number: String,
  pub grade:       String,
  pub section:     String,
  #[serde(default)]
  pub guardian_id: Option<Uuid>,
}
