//! Session and tenant resolution.
//!
//! Maps the signed-in identity onto its companies and subscriptions.
//! Resolution is best-effort by design: a failed lookup aborts early,
//! leaves every not-yet-computed field empty and reports through the
//! notifier side channel instead of raising. An empty result is a valid
//! state ("signed out" or "signed in, no tenant yet"), never an error.

use tracing::{debug, warn};

use crate::gateway::Gateway;
use crate::models::{Company, Identity, Membership, Subscription};
use crate::notify::Notifier;

#[derive(Debug, Clone, Default)]
pub struct ResolvedTenant {
    pub companies: Vec<Company>,
    pub subscriptions: Vec<Subscription>,
}

impl ResolvedTenant {
    /// First company in gateway return order. Arbitrary for identities with
    /// multiple memberships; no deterministic tie-break is defined yet.
    pub fn primary_company(&self) -> Option<&Company> {
        self.companies.first()
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscriptions.first()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty() && self.subscriptions.is_empty()
    }
}

/// Resolves `identity` to its tenant data. Idempotent and safe to call at
/// any time; `None` identity short-circuits to the empty result.
pub async fn resolve(
    gateway: &Gateway,
    notifier: &Notifier,
    identity: Option<&Identity>,
) -> ResolvedTenant {
    let Some(identity) = identity else {
        return ResolvedTenant::default();
    };

    debug!(user_id = %identity.id, "Resolving tenant");

    let memberships: Vec<Membership> = match gateway
        .table("company_users")
        .select("*")
        .eq("user_id", identity.id)
        .fetch()
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!(user_id = %identity.id, error = %e, "Membership lookup failed");
            notifier.error("Failed to load account data", e.to_string());
            return ResolvedTenant::default();
        }
    };

    if memberships.is_empty() {
        // Signed in but not yet associated with any tenant.
        debug!(user_id = %identity.id, "Identity has no company membership");
        return ResolvedTenant::default();
    }

    let company_ids: Vec<_> = memberships.iter().map(|m| m.company_id).collect();

    let companies: Vec<Company> = match gateway
        .table("companies")
        .select("*")
        .in_("id", &company_ids)
        .fetch()
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!(user_id = %identity.id, error = %e, "Company lookup failed");
            notifier.error("Failed to load company data", e.to_string());
            return ResolvedTenant::default();
        }
    };

    let subscriptions: Vec<Subscription> = match gateway
        .table("subscriptions")
        .select("*")
        .in_("company_id", &company_ids)
        .fetch()
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!(user_id = %identity.id, error = %e, "Subscription lookup failed");
            notifier.error("Failed to load subscription data", e.to_string());
            return ResolvedTenant {
                companies,
                subscriptions: Vec::new(),
            };
        }
    };

    debug!(
        user_id = %identity.id,
        companies = companies.len(),
        subscriptions = subscriptions.len(),
        "Resolved tenant"
    );

    ResolvedTenant {
        companies,
        subscriptions,
    }
}
