//! Fee records and the ledger rules that derive state from them.
//!
//! A fee record is one student's obligation for one calendar month. Two
//! cached aggregates hang off the record set: the guardian's pending
//! balance and the student's active flag. The functions in this module are
//! the only definition of how those aggregates are computed; storage
//! backends call them inside the same transaction as the record write.

use chrono::{DateTime, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, month::Month};

/// A student is discontinued once this many of their records are overdue.
pub const DISCONTINUATION_THRESHOLD: usize = 2;

/// Amounts carry at most this many decimal places.
pub const AMOUNT_SCALE: u32 = 2;

/// Largest accepted amount: ten digits, two of them after the point.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeeStatus {
  #[default]
  Unpaid,
  Paid,
  Overdue,
  Waived,
}

impl FeeStatus {
  /// Whether the amount still counts towards the guardian's pending balance.
  pub fn is_outstanding(self) -> bool {
    matches!(self, Self::Unpaid | Self::Overdue)
  }

  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownStatus(s.to_owned()))
  }

  pub fn as_str(self) -> &'static str { self.into() }
}

// ─── Record ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
  pub fee_id:     Uuid,
  pub student_id: Uuid,
  pub month:      Month,
  pub amount:     Decimal,
  pub status:     FeeStatus,
  pub due_date:   NaiveDate,
  /// Set while the record is Paid; cleared by any other status.
  pub paid_date:  Option<NaiveDate>,
  pub remarks:    String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl FeeRecord {
  /// Unpaid and past its due date. A display hint only; status is never
  /// changed by it.
  pub fn is_past_due(&self, today: NaiveDate) -> bool {
    self.status == FeeStatus::Unpaid && self.due_date < today
  }
}

/// Input to [`crate::store::SchoolStore::upsert_fee_record`] and
/// [`crate::store::SchoolStore::create_fee_record`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeRecordInput {
  pub student_id: Uuid,
  pub month:      Month,
  pub amount:     Decimal,
  pub due_date:   NaiveDate,
  #[serde(default)]
  pub status:     FeeStatus,
  #[serde(default)]
  pub remarks:    String,
}

impl FeeRecordInput {
  pub fn validate(&self) -> Result<()> {
    if self.amount < Decimal::ZERO {
      return Err(Error::NegativeAmount);
    }
    if self.amount.normalize().scale() > AMOUNT_SCALE || self.amount > MAX_AMOUNT {
      return Err(Error::InvalidAmount(self.amount));
    }
    Ok(())
  }
}

/// Optional filters for [`crate::store::SchoolStore::list_fee_records`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeeQuery {
  pub student_id: Option<Uuid>,
  pub month:      Option<Month>,
  pub status:     Option<FeeStatus>,
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// The `paid_date` a record carries after moving to `status`.
///
/// Paid keeps an existing date (so repeating the call never drifts) and
/// otherwise stamps `today`. Every other status clears it: the field marks
/// "currently paid", not a payment history.
pub fn derive_paid_date(
  status: FeeStatus,
  current: Option<NaiveDate>,
  today: NaiveDate,
) -> Option<NaiveDate> {
  match status {
    FeeStatus::Paid => Some(current.unwrap_or(today)),
    _ => None,
  }
}

/// Sum of outstanding amounts over `records`.
pub fn pending_total<'a, I>(records: I) -> Result<Decimal>
where
  I: IntoIterator<Item = (FeeStatus, &'a Decimal)>,
{
  records
    .into_iter()
    .filter(|(status, _)| status.is_outstanding())
    .try_fold(Decimal::ZERO, |total, (_, amount)| add_amount(total, *amount))
}

fn add_amount(total: Decimal, amount: Decimal) -> Result<Decimal> {
  total.checked_add(amount).ok_or(Error::AmountOverflow)
}

/// The active flag implied by a student's overdue record count.
pub fn is_active_with(overdue_count: usize) -> bool {
  overdue_count < DISCONTINUATION_THRESHOLD
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Fee figures for one month across every student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSummary {
  pub month:             Month,
  pub record_count:      usize,
  pub paid_count:        usize,
  /// Sum of Paid amounts.
  pub total_income:      Decimal,
  pub outstanding_count: usize,
  /// Sum of Unpaid and Overdue amounts.
  pub total_pending:     Decimal,
  pub waived_count:      usize,
}

impl FeeSummary {
  pub fn from_records<'a>(
    month: Month,
    records: impl IntoIterator<Item = &'a FeeRecord>,
  ) -> Result<Self> {
    let mut summary = Self {
      month,
      record_count: 0,
      paid_count: 0,
      total_income: Decimal::ZERO,
      outstanding_count: 0,
      total_pending: Decimal::ZERO,
      waived_count: 0,
    };
    for record in records {
      summary.record_count += 1;
      match record.status {
        FeeStatus::Paid => {
          summary.paid_count += 1;
          summary.total_income = add_amount(summary.total_income, record.amount)?;
        }
        FeeStatus::Unpaid | FeeStatus::Overdue => {
          summary.outstanding_count += 1;
          summary.total_pending = add_amount(summary.total_pending, record.amount)?;
        }
        FeeStatus::Waived => summary.waived_count += 1,
      }
    }
    Ok(summary)
  }
}

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Source of "today" for paid-date stamping.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
  /// The host's local calendar date.
  #[default]
  System,
  Fixed(NaiveDate),
}

impl Clock {
  pub fn today(&self) -> NaiveDate {
    match self {
      Self::System => Local::now().date_naive(),
      Self::Fixed(date) => *date,
    }
  }
}
