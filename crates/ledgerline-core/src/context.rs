//! # Request Context
//!
//! The tenant, environment and acting user of one call. Every repository
//! operation takes a [`RequestContext`]; it is the only source of the
//! tenant/environment predicates and of the `created_by`/`updated_by` stamps.

use serde::{Deserialize, Serialize};

/// Scope of a single repository call.
///
/// ## Example
/// ```rust
/// use ledgerline_core::RequestContext;
///
/// let ctx = RequestContext::new("tenant_1")
///     .with_environment("env_live")
///     .with_user("user_42");
///
/// assert_eq!(ctx.tenant_id(), "tenant_1");
/// assert_eq!(ctx.environment_id(), Some("env_live"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    tenant_id: String,
    environment_id: Option<String>,
    user_id: String,
}

impl RequestContext {
    /// Creates a context for `tenant_id` with no environment and no user.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        RequestContext {
            tenant_id: tenant_id.into(),
            environment_id: None,
            user_id: String::new(),
        }
    }

    /// Scopes the context to an environment. An empty id clears it.
    pub fn with_environment(mut self, environment_id: impl Into<String>) -> Self {
        let environment_id = environment_id.into();
        self.environment_id = (!environment_id.is_empty()).then_some(environment_id);
        self
    }

    /// Sets the acting user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The environment, or `None` when the call is not environment scoped.
    pub fn environment_id(&self) -> Option<&str> {
        self.environment_id.as_deref()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_environment_is_none() {
        let ctx = RequestContext::new("t1").with_environment("");
        assert_eq!(ctx.environment_id(), None);
    }

    #[test]
    fn test_user_defaults_to_empty() {
        let ctx = RequestContext::new("t1");
        assert_eq!(ctx.user_id(), "");
    }
}
