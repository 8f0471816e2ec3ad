//! Listener actions and rule conditions
//!
//! Used for the listeners' default actions and for tenant routing rules.

use crate::types::ResourceRef;
use serde_json::{json, Value};
use std::fmt;

/// Session lifetime for authenticated tenant traffic (7 days)
pub const SESSION_TIMEOUT_SECS: u64 = 604_800;

/// Match condition of a listener rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCondition {
    /// Exact `Host` header
    HostHeader(String),
    /// URL path glob
    PathPattern(String),
}

impl RuleCondition {
    /// Property form
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::HostHeader(host) => json!({ "field": "host-header", "values": [host] }),
            Self::PathPattern(path) => json!({ "field": "path-pattern", "values": [path] }),
        }
    }
}

impl fmt::Display for RuleCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostHeader(host) => write!(f, "host={host}"),
            Self::PathPattern(path) => write!(f, "path={path}"),
        }
    }
}

/// Action taken by a listener or rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerAction {
    /// Authenticate against a user pool, then run `next`
    AuthenticateCognito {
        user_pool: ResourceRef,
        user_pool_client: ResourceRef,
        user_pool_domain: ResourceRef,
        session_cookie_name: String,
        session_timeout_secs: u64,
        next: Box<ListenerAction>,
    },
    /// Forward to a target group
    Forward { target_group: ResourceRef },
    /// Answer directly
    FixedResponse {
        status_code: u16,
        content_type: String,
        message_body: String,
    },
    /// Redirect to another protocol/port
    Redirect {
        protocol: String,
        port: u16,
        permanent: bool,
    },
}

impl ListenerAction {
    /// Plain-text fixed response
    #[must_use]
    pub fn fixed_text(status_code: u16, message_body: impl Into<String>) -> Self {
        Self::FixedResponse {
            status_code,
            content_type: "text/plain".to_string(),
            message_body: message_body.into(),
        }
    }

    /// Temporary redirect to HTTPS on `port`
    #[must_use]
    pub fn redirect_to_https(port: u16) -> Self {
        Self::Redirect {
            protocol: "HTTPS".to_string(),
            port,
            permanent: false,
        }
    }

    /// Target group that finally receives the request, if any
    #[must_use]
    pub fn forward_target(&self) -> Option<&ResourceRef> {
        match self {
            Self::AuthenticateCognito { next, .. } => next.forward_target(),
            Self::Forward { target_group } => Some(target_group),
            Self::FixedResponse { .. } | Self::Redirect { .. } => None,
        }
    }

    /// Whether the chain starts with authentication
    #[inline]
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::AuthenticateCognito { .. })
    }

    /// Ordered action list, as attached to a listener or rule
    #[must_use]
    pub fn to_actions(&self) -> Vec<Value> {
        let mut actions = Vec::new();
        let mut current = Some(self);
        while let Some(action) = current {
            let order = actions.len() + 1;
            let (value, next) = action.single(order);
            actions.push(value);
            current = next;
        }
        actions
    }

    fn single(&self, order: usize) -> (Value, Option<&ListenerAction>) {
        match self {
            Self::AuthenticateCognito {
                user_pool,
                user_pool_client,
                user_pool_domain,
                session_cookie_name,
                session_timeout_secs,
                next,
            } => (
                json!({
                    "type": "authenticate-cognito",
                    "order": order,
                    "user_pool": user_pool.to_ref(),
                    "user_pool_client": user_pool_client.to_ref(),
                    "user_pool_domain": user_pool_domain.to_ref(),
                    "session_cookie_name": session_cookie_name,
                    "session_timeout": session_timeout_secs,
                }),
                Some(next.as_ref()),
            ),
            Self::Forward { target_group } => (
                json!({
                    "type": "forward",
                    "order": order,
                    "target_group": target_group.to_ref(),
                }),
                None,
            ),
            Self::FixedResponse {
                status_code,
                content_type,
                message_body,
            } => (
                json!({
                    "type": "fixed-response",
                    "order": order,
                    "status_code": status_code.to_string(),
                    "content_type": content_type,
                    "message_body": message_body,
                }),
                None,
            ),
            Self::Redirect {
                protocol,
                port,
                permanent,
            } => (
                json!({
                    "type": "redirect",
                    "order": order,
                    "protocol": protocol,
                    "port": port.to_string(),
                    "status_code": if *permanent { "HTTP_301" } else { "HTTP_302" },
                }),
                None,
            ),
        }
    }
}
