//! Authenticated user context.
//!
//! Session mechanics live in the authenticating front end; it forwards the
//! caller's identity in `X-User-ID` / `X-User-Role` headers. Every route
//! except the public shared-proposal endpoints requires these headers.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;
use vsuite_core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn from_string(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::Member,
        }
    }
}

/// Caller identity extracted from request headers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins may edit anything; members only what they own.
    pub fn can_edit(&self, owner_id: Uuid) -> bool {
        self.is_admin() || self.user_id == owner_id
    }

    /// Owner, assignee or admin may edit a task.
    pub fn can_edit_assigned(&self, owner_id: Uuid, assignee_id: Option<Uuid>) -> bool {
        self.can_edit(owner_id) || assignee_id == Some(self.user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("X-User-ID")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::AuthError(anyhow::anyhow!("Missing X-User-ID header"))
            })?;

        let user_id: Uuid = user_id.parse().map_err(|_| {
            AppError::AuthError(anyhow::anyhow!("Invalid X-User-ID header"))
        })?;

        let role = parts
            .headers
            .get("X-User-Role")
            .and_then(|v| v.to_str().ok())
            .map(Role::from_string)
            .unwrap_or(Role::Member);

        let span = tracing::Span::current();
        span.record("user_id", user_id.to_string().as_str());

        Ok(CurrentUser { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_member() {
        assert_eq!(Role::from_string("admin"), Role::Admin);
        assert_eq!(Role::from_string("member"), Role::Member);
        assert_eq!(Role::from_string("anything"), Role::Member);
    }

    #[test]
    fn edit_permissions() {
        let owner = Uuid::new_v4();
        let assignee = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let admin = CurrentUser {
            user_id: stranger,
            role: Role::Admin,
        };
        let member = CurrentUser {
            user_id: assignee,
            role: Role::Member,
        };

        assert!(admin.can_edit(owner));
        assert!(!member.can_edit(owner));
        assert!(member.can_edit_assigned(owner, Some(assignee)));
        assert!(!member.can_edit_assigned(owner, None));
    }
}
