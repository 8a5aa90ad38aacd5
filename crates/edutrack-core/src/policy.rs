//! Role-based access policy.
//!
//! Every outer layer asks [`can`] before performing an operation instead of
//! re-deriving role rules per endpoint.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Teacher,
  Student,
  Parent,
}

/// Who is asking. A student actor's id is their student id; a parent
/// actor's id is their guardian id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id: Uuid,
  pub role:    Role,
}

impl Actor {
  pub fn new(user_id: Uuid, role: Role) -> Self { Self { user_id, role } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  ManageGuardians,
  ViewGuardian,
  ManageStudents,
  ViewStudent,
  ManageFees,
  ViewFees,
  ViewFeeSummary,
  CreateTopic,
  EditTopic,
  ViewRoadmap,
}

/// What the operation touches, carrying just enough to decide ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
  Any,
  Guardian { guardian_id: Uuid },
  Student { student_id: Uuid, guardian_id: Option<Uuid> },
  Topic { owner_id: Uuid },
}

pub fn can(actor: &Actor, operation: Operation, target: Target) -> bool {
  use Operation::*;
  use Role::*;

  let is_self_or_guardian = || match target {
    Target::Student { student_id, guardian_id } => match actor.role {
      Student => actor.user_id == student_id,
      Parent => guardian_id == Some(actor.user_id),
      Admin | Teacher => false,
    },
    _ => false,
  };

  match operation {
    ManageGuardians | ManageFees | ViewFeeSummary => actor.role == Admin,
    ViewGuardian => match target {
      Target::Guardian { guardian_id } => {
        actor.role == Admin || (actor.role == Parent && actor.user_id == guardian_id)
      }
      _ => actor.role == Admin,
    },
    ManageStudents => matches!(actor.role, Admin | Teacher),
    ViewStudent => matches!(actor.role, Admin | Teacher) || is_self_or_guardian(),
    ViewFees => actor.role == Admin || is_self_or_guardian(),
    CreateTopic => actor.role == Teacher,
    EditTopic => match target {
      Target::Topic { owner_id } => actor.role == Teacher && actor.user_id == owner_id,
      _ => false,
    },
    ViewRoadmap => true,
  }
}
