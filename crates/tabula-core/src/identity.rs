//! Caller identity types.
//!
//! A [`Caller`] is established per request by the authentication gate:
//! either an interactive [`UserIdentity`] restored from the session, a
//! [`ServiceIdentity`] validated from the internal `X-Tx-*` headers, or
//! `Anonymous` when no credentials were presented.

use serde::{Deserialize, Serialize};

use crate::permission::PermissionSet;

/// An authenticated interactive user.
///
/// Constructed per request from the session record; not persisted beyond
/// the session itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable user identifier.
    pub user_id: String,
    /// Display name shown in the editor UI.
    pub display_name: Option<String>,
    /// E-mail address, if known.
    pub email: Option<String>,
    /// Role names assigned to the user.
    pub roles: Vec<String>,
    /// Effective permission grants.
    pub permissions: PermissionSet,
}

impl UserIdentity {
    /// Creates a user identity with the given id and roles.
    ///
    /// Permissions default to the role names themselves; richer mappings
    /// are applied by the session layer when the session is established.
    #[must_use]
    pub fn new(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        let permissions = PermissionSet::from_iter(roles.iter().cloned());
        Self {
            user_id: user_id.into(),
            display_name: None,
            email: None,
            roles,
            permissions,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the e-mail address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Replaces the permission set.
    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }
}

/// An internal sibling service validated from the `X-Tx-Service` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Registered service identifier.
    pub service_id: String,
    /// User id the service is acting for, from `X-Tx-User`, if any.
    pub on_behalf_of: Option<String>,
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Caller {
    /// An interactive user restored from the session.
    User(UserIdentity),
    /// An internal service presenting a propagated-identity header.
    Service(ServiceIdentity),
    /// No credentials presented.
    Anonymous,
}

impl Caller {
    /// Creates a user caller.
    #[must_use]
    pub fn user(identity: UserIdentity) -> Self {
        Self::User(identity)
    }

    /// Creates a service caller.
    #[must_use]
    pub fn service(service_id: impl Into<String>, on_behalf_of: Option<String>) -> Self {
        Self::Service(ServiceIdentity {
            service_id: service_id.into(),
            on_behalf_of,
        })
    }

    /// Returns true unless the caller is anonymous.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes secrets or tokens.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::User(u) => format!("user:{}", u.user_id),
            Self::Service(s) => format!("service:{}", s.service_id),
            Self::Anonymous => "anonymous".to_string(),
        }
    }

    /// Returns the effective permission set of the caller.
    ///
    /// Internal services operate with the wildcard grant: the hierarchy is
    /// never stripped for service-to-service traffic.
    #[must_use]
    pub fn permissions(&self) -> PermissionSet {
        match self {
            Self::User(u) => u.permissions.clone(),
            Self::Service(_) => PermissionSet::wildcard(),
            Self::Anonymous => PermissionSet::default(),
        }
    }
}
