//! Error types for `edutrack-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::month::Month;

#[derive(Debug, Error)]
pub enum Error {
  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("guardian not found: {0}")]
  GuardianNotFound(Uuid),

  #[error("fee record not found: {0}")]
  FeeRecordNotFound(Uuid),

  #[error("topic not found: {0}")]
  TopicNotFound(Uuid),

  #[error("student {student_id} already has a fee record for {month}")]
  DuplicateFeeRecord { student_id: Uuid, month: Month },

  #[error("roll number {0:?} is already taken")]
  DuplicateRollNumber(String),

  #[error("invalid month {0:?}: expected MM/YYYY")]
  InvalidMonth(String),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),

  #[error("fee amount must not be negative")]
  NegativeAmount,

  #[error("fee amount {0} exceeds 10 digits with 2 decimal places")]
  InvalidAmount(rust_decimal::Decimal),

  #[error("fee total overflowed while summing amounts")]
  AmountOverflow,

  #[error("topic {parent_id} belongs to another owner")]
  CrossOwnerParent { parent_id: Uuid },

  #[error("topic hierarchy contains a cycle through {0}")]
  TopicCycle(Uuid),

  #[error("topic {0} is owned by someone else")]
  NotTopicOwner(Uuid),

  /// A derived aggregate could not be recomputed after a record write. The
  /// write must not be committed without it.
  #[error("could not recompute {step} for student {student_id}: {reason}")]
  Consistency {
    student_id: Uuid,
    step:       &'static str,
    reason:     String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse error category used by outer layers to pick a response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Malformed or conflicting input; nothing was written.
  Validation,
  /// The write collides with an existing record; nothing was written.
  Conflict,
  /// A referenced entity does not exist; nothing was written.
  NotFound,
  /// The caller may not perform the operation.
  Forbidden,
  /// A record write could not be paired with its recompute and was rolled
  /// back.
  Consistency,
  /// Storage or decoding failure.
  Internal,
}

/// Implemented by every error a [`SchoolStore`](crate::store::SchoolStore)
/// backend can return.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::StudentNotFound(_)
      | Self::GuardianNotFound(_)
      | Self::FeeRecordNotFound(_)
      | Self::TopicNotFound(_) => ErrorKind::NotFound,
      Self::DuplicateFeeRecord { .. } | Self::DuplicateRollNumber(_) => ErrorKind::Conflict,
      Self::InvalidMonth(_)
      | Self::UnknownStatus(_)
      | Self::NegativeAmount
      | Self::InvalidAmount(_)
      | Self::AmountOverflow
      | Self::CrossOwnerParent { .. }
      | Self::TopicCycle(_) => ErrorKind::Validation,
      Self::NotTopicOwner(_) => ErrorKind::Forbidden,
      Self::Consistency { .. } => ErrorKind::Consistency,
    }
  }
}
