//! Read-only entitlement lookup.
//!
//! Reads go straight to the access store, so a grant is visible as soon as
//! the fulfillment call that wrote it returns.

use crate::store::AccessStore;
use crate::PaygateError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Content a user has unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlements {
    /// User the set belongs to.
    pub user_id: String,
    /// Unlocked content references, sorted.
    pub content_refs: BTreeSet<String>,
}

impl Entitlements {
    /// Whether `content_ref` is unlocked.
    pub fn contains(&self, content_ref: &str) -> bool {
        self.content_refs.contains(content_ref)
    }
}

/// Entitlement queries for collaborators that gate content.
pub struct AccessQuery {
    access: Arc<dyn AccessStore>,
}

impl AccessQuery {
    /// Create a query service over an access store.
    pub fn new(access: Arc<dyn AccessStore>) -> Self {
        Self { access }
    }

    /// Everything `user_id` has unlocked.
    pub fn entitlements(&self, user_id: &str) -> Result<Entitlements, PaygateError> {
        Ok(Entitlements {
            user_id: user_id.to_string(),
            content_refs: self.access.granted(user_id)?,
        })
    }

    /// Whether `user_id` may read `content_ref`.
    pub fn has_access(&self, user_id: &str, content_ref: &str) -> Result<bool, PaygateError> {
        self.access.is_granted(user_id, content_ref)
    }

    /// Require access to `content_ref`.
    ///
    /// # Errors
    /// `EntitlementMissing` when the user has not unlocked the content.
    pub fn check_access(&self, user_id: &str, content_ref: &str) -> Result<(), PaygateError> {
        if !self.has_access(user_id, content_ref)? {
            return Err(PaygateError::EntitlementMissing {
                content_ref: content_ref.to_string(),
            });
        }
        Ok(())
    }
}
