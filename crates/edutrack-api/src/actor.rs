//! Caller identity extractor.
//!
//! Authentication happens upstream; the fronting layer forwards the
//! authenticated user as `x-actor-id` and `x-actor-role` headers.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use edutrack_core::policy::{self, Actor, Operation, Role, Target};
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The actor making the current request.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl CurrentActor {
  /// Fail with 403 unless the policy allows `operation` on `target`.
  pub fn authorize(&self, operation: Operation, target: Target) -> Result<(), ApiError> {
    if policy::can(&self.0, operation, target) {
      Ok(())
    } else {
      tracing::debug!(actor = %self.0.user_id, role = %self.0.role, ?operation, "denied");
      Err(ApiError::Forbidden)
    }
  }

  pub fn allows(&self, operation: Operation, target: Target) -> bool {
    policy::can(&self.0, operation, target)
  }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let user_id = header(headers, ACTOR_ID_HEADER)
    .and_then(|v| Uuid::parse_str(v).ok())
    .ok_or(ApiError::Unauthorized)?;
  let role = header(headers, ACTOR_ROLE_HEADER)
    .and_then(|v| v.parse::<Role>().ok())
    .ok_or(ApiError::Unauthorized)?;
  Ok(Actor::new(user_id, role))
}

impl<S> FromRequestParts<S> for CurrentActor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers).map(CurrentActor)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  #[test]
  fn parses_actor_headers() {
    let id = Uuid::new_v4();
    let mut headers = HeaderMap::new();
    headers.insert(ACTOR_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
    headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("teacher"));

    let actor = actor_from_headers(&headers).unwrap();
    assert_eq!(actor, Actor::new(id, Role::Teacher));
  }

  #[test]
  fn missing_or_bad_headers_are_unauthorized() {
    let mut headers = HeaderMap::new();
    assert!(matches!(actor_from_headers(&headers), Err(ApiError::Unauthorized)));

    headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
    headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("admin"));
    assert!(matches!(actor_from_headers(&headers), Err(ApiError::Unauthorized)));
  }
}
