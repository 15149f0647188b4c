//! Per-request actor context.
//!
//! Authentication happens in front of this service. The authenticating proxy
//! forwards the caller's identity in two headers, which [`Actor`] reads.

use std::str::FromStr as _;

use axum::{extract::FromRequestParts, http::request::Parts};
use darasa_core::{
  school::{Role, Staff},
  store::SchoolStore,
};

use crate::error::ApiError;

/// Header carrying the caller's `user_id`.
pub const USER_HEADER: &str = "x-darasa-user";
/// Header carrying the caller's role, e.g. `Head Teacher`.
pub const ROLE_HEADER: &str = "x-darasa-role";

/// The user a request acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub user_id: i64,
  pub role:    Role,
}

impl Actor {
  /// Fail with 403 unless the actor holds one of `roles`.
  pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&self.role) {
      Ok(())
    } else {
      Err(ApiError::Forbidden(format!(
        "role {} may not perform this action",
        self.role
      )))
    }
  }

  /// The actor's staff assignment, which must carry the actor's role.
  pub async fn staff<S: SchoolStore>(&self, store: &S) -> Result<Staff, ApiError> {
    let staff = store
      .staff_for_user(self.user_id)
      .await
      .map_err(ApiError::from_store)?
      .ok_or_else(|| {
        ApiError::Forbidden(format!("user {} has no staff assignment", self.user_id))
      })?;
    if staff.role != self.role {
      return Err(ApiError::Forbidden(format!(
        "user {} is assigned as {}, not {}",
        self.user_id, staff.role, self.role
      )));
    }
    Ok(staff)
  }
}

impl<S> FromRequestParts<S> for Actor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let header = |name: &str| {
      parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))
    };

    let user_id = header(USER_HEADER)?
      .parse::<i64>()
      .map_err(|_| ApiError::Unauthorized(format!("malformed {USER_HEADER} header")))?;
    let role = Role::from_str(header(ROLE_HEADER)?)
      .map_err(|_| ApiError::Unauthorized(format!("unknown role in {ROLE_HEADER} header")))?;

    Ok(Actor { user_id, role })
  }
}
