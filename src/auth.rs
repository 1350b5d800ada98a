use crate::db::DbPool;
use crate::entities::user;
use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Identity headers set by the edge proxy in front of the API.
pub const USER_ID_HEADER: &str = "x-forwarded-user-id";
pub const USER_EMAIL_HEADER: &str = "x-forwarded-user-email";
pub const ACCESS_TOKEN_HEADER: &str = "x-forwarded-access-token";

/// Caller identity forwarded by the edge proxy. Missing or malformed headers
/// yield an anonymous context; the permission checker decides what that
/// identity may do.
#[derive(Debug, Clone, Default)]
pub struct UserContext {
    pub user_id: Option<i32>,
    pub user_email: Option<String>,
    pub access_token: Option<String>,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(&self) -> bool {
        self.user_id.is_some() || self.user_email.is_some()
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i32>().ok());

        let user_email = headers
            .get(USER_EMAIL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let access_token = headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty());

        Self {
            user_id,
            user_email,
            access_token,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(UserContext::from_headers(&parts.headers))
    }
}

/// Mutating actions subject to permission checks. Reads are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateOrder,
    ApproveOrder,
    FulfillOrder,
    CancelOrder,
    UpdateOrder,
    AdjustInventory,
    CreateStore,
    CreateProduct,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::CreateOrder => "create_order",
            Action::ApproveOrder => "approve_order",
            Action::FulfillOrder => "fulfill_order",
            Action::CancelOrder => "cancel_order",
            Action::UpdateOrder => "update_order",
            Action::AdjustInventory => "adjust_inventory",
            Action::CreateStore => "create_store",
            Action::CreateProduct => "create_product",
        }
    }

    /// Approval and fulfillment commit inventory across stores, so they are
    /// reserved for regional managers.
    pub fn requires_regional_manager(&self) -> bool {
        matches!(self, Action::ApproveOrder | Action::FulfillOrder)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Decides whether a caller may perform an action. Injected into AppState as
/// a trait object so tests and deployments can swap the policy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn check(&self, ctx: &UserContext, action: Action) -> Result<(), ServiceError>;
}

/// Role-based policy backed by the users table.
pub struct RoleBasedChecker {
    db: Arc<DbPool>,
}

impl RoleBasedChecker {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Resolves the forwarded identity to a user row, preferring the id
    /// header over the email header.
    async fn resolve_user(&self, ctx: &UserContext) -> Result<Option<user::Model>, ServiceError> {
        if let Some(id) = ctx.user_id {
            let found = user::Entity::find_by_id(id).one(self.db.as_ref()).await?;
            if found.is_some() {
                return Ok(found);
            }
        }

        if let Some(email) = &ctx.user_email {
            let found = user::Entity::find()
                .filter(user::Column::Email.eq(email.clone()))
                .one(self.db.as_ref())
                .await?;
            return Ok(found);
        }

        Ok(None)
    }
}

#[async_trait]
impl PermissionChecker for RoleBasedChecker {
    async fn check(&self, ctx: &UserContext, action: Action) -> Result<(), ServiceError> {
        if !ctx.authenticated() {
            debug!(action = %action, "Denying anonymous request");
            return Err(ServiceError::Unauthorized(format!(
                "{} requires authentication",
                action
            )));
        }

        let user = match self.resolve_user(ctx).await? {
            Some(user) => user,
            None => {
                debug!(action = %action, user_id = ?ctx.user_id, "Forwarded identity matches no user");
                return Err(ServiceError::Unauthorized(format!(
                    "{} requires a known user",
                    action
                )));
            }
        };

        if action.requires_regional_manager() && user.role != user::ROLE_REGIONAL_MANAGER {
            debug!(
                action = %action,
                user_id = user.id,
                role = %user.role,
                "Denying action reserved for regional managers"
            );
            return Err(ServiceError::Forbidden(format!(
                "{} requires the regional_manager role",
                action
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::Request;

    fn parts_with_headers(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/orders");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[tokio::test]
    async fn extractor_reads_forwarded_identity_headers() {
        let mut parts = parts_with_headers(&[
            (USER_ID_HEADER, "7"),
            (USER_EMAIL_HEADER, "mia.torres@example.com"),
            (ACCESS_TOKEN_HEADER, "opaque-token"),
        ]);

        let ctx = UserContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(ctx.authenticated());
        assert_eq!(ctx.user_id, Some(7));
        assert_eq!(ctx.user_email.as_deref(), Some("mia.torres@example.com"));
        assert_eq!(ctx.access_token.as_deref(), Some("opaque-token"));
    }

    #[tokio::test]
    async fn missing_headers_yield_anonymous_context() {
        let mut parts = parts_with_headers(&[]);

        let ctx = UserContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(!ctx.authenticated());
        assert_eq!(ctx.user_id, None);
        assert_eq!(ctx.user_email, None);
    }

    #[test]
    fn malformed_user_id_is_ignored() {
        let parts = parts_with_headers(&[(USER_ID_HEADER, "not-a-number")]);
        let ctx = UserContext::from_headers(&parts.headers);
        assert_eq!(ctx.user_id, None);
        assert!(!ctx.authenticated());
    }

    #[test]
    fn only_approval_and_fulfillment_need_the_manager_role() {
        assert!(Action::ApproveOrder.requires_regional_manager());
        assert!(Action::FulfillOrder.requires_regional_manager());
        assert!(!Action::CreateOrder.requires_regional_manager());
        assert!(!Action::CancelOrder.requires_regional_manager());
        assert!(!Action::AdjustInventory.requires_regional_manager());
    }

    #[tokio::test]
    async fn checker_dispatches_through_trait_object() {
        let mut mock = MockPermissionChecker::new();
        mock.expect_check()
            .withf(|_, action| *action == Action::ApproveOrder)
            .returning(|_, _| {
                Err(ServiceError::Forbidden(
                    "approve_order requires the regional_manager role".to_string(),
                ))
            });

        let checker: Arc<dyn PermissionChecker> = Arc::new(mock);
        let ctx = UserContext {
            user_id: Some(3),
            ..UserContext::anonymous()
        };

        let denied = checker.check(&ctx, Action::ApproveOrder).await;
        assert_matches!(denied, Err(ServiceError::Forbidden(_)));
    }
}
