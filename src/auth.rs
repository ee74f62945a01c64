//! Caller identity and the article management capability gate
//!
//! Authentication itself lives upstream: the session layer terminates the
//! sign-in flow and forwards the caller's identity on trusted headers.
//! This module turns those headers into an explicit [`Caller`] value and
//! gates mutating operations through [`authorize`], so nothing here reads
//! ambient session state.

use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// Header carrying the signed-in user's id, set by the session layer
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's comma-separated capabilities
pub const CAPABILITIES_HEADER: &str = "x-user-capabilities";

/// Capability required for create/update/delete and the create/edit forms
pub const MANAGE_ARTICLES: &str = "manage-articles";

/// Where unauthenticated callers are sent for mutating routes
pub const SIGN_IN_PATH: &str = "/login";

/// The identity of the caller for the current request.
///
/// Anonymous callers have no user id and an empty capability set; they may
/// read articles but every mutating route turns them away at [`authorize`].
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user_id: Option<Uuid>,
    pub capabilities: Vec<String>,
}

impl Caller {
    /// An unauthenticated caller
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A signed-in caller with the given capabilities
    pub fn signed_in(user_id: Uuid, capabilities: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id),
            capabilities,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Check if the caller holds a capability. The `admin` capability
    /// implies all others.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities
            .iter()
            .any(|c| c == capability || c == "admin")
    }
}

/// Actions subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageArticles,
}

impl Action {
    fn capability(&self) -> &'static str {
        match self {
            Action::ManageArticles => MANAGE_ARTICLES,
        }
    }
}

/// Decide whether `caller` may perform `action`.
///
/// Anonymous callers get [`AppError::AuthenticationRequired`] (rendered as
/// a redirect to sign-in); signed-in callers without the capability get
/// [`AppError::Forbidden`]. Runs before validation and before any side
/// effect.
pub fn authorize(caller: &Caller, action: Action) -> Result<()> {
    if !caller.is_authenticated() {
        return Err(AppError::AuthenticationRequired);
    }

    let capability = action.capability();
    if caller.has_capability(capability) {
        Ok(())
    } else {
        Err(AppError::Forbidden {
            message: format!("Missing required capability: {}", capability),
        })
    }
}

/// Axum extractor building a [`Caller`] from the session layer's identity
/// headers. Never rejects: absent or malformed headers produce an
/// anonymous caller, and the route decides what anonymous may do.
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Infallible> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        let capabilities = parts
            .headers
            .get(CAPABILITIES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Caller {
            user_id,
            capabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn staff() -> Caller {
        Caller::signed_in(Uuid::new_v4(), vec![MANAGE_ARTICLES.to_string()])
    }

    #[test]
    fn test_anonymous_is_redirected_to_sign_in() {
        let result = authorize(&Caller::anonymous(), Action::ManageArticles);
        assert!(matches!(result, Err(AppError::AuthenticationRequired)));
    }

    #[test]
    fn test_signed_in_without_capability_is_forbidden() {
        let caller = Caller::signed_in(Uuid::new_v4(), vec![]);
        let result = authorize(&caller, Action::ManageArticles);
        assert!(matches!(result, Err(AppError::Forbidden { .. })));
    }

    #[test]
    fn test_capability_holder_is_authorized() {
        assert!(authorize(&staff(), Action::ManageArticles).is_ok());
    }

    #[test]
    fn test_admin_implies_manage_articles() {
        let caller = Caller::signed_in(Uuid::new_v4(), vec!["admin".to_string()]);
        assert!(caller.has_capability(MANAGE_ARTICLES));
        assert!(authorize(&caller, Action::ManageArticles).is_ok());
    }

    #[tokio::test]
    async fn test_extractor_parses_identity_headers() {
        let user_id = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, user_id.to_string())
            .header(CAPABILITIES_HEADER, "manage-articles, view-reports")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.user_id, Some(user_id));
        assert!(caller.has_capability(MANAGE_ARTICLES));
        assert!(caller.has_capability("view-reports"));
    }

    #[tokio::test]
    async fn test_extractor_defaults_to_anonymous() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();

        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(!caller.is_authenticated());
        assert!(caller.capabilities.is_empty());
    }

    #[tokio::test]
    async fn test_extractor_ignores_malformed_user_id() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let caller = Caller::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(!caller.is_authenticated());
    }
}
