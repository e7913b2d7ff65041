//! Top-level view routing.
//!
//! One pure function from resolved state to exactly one of five views,
//! replacing the cascade of boolean flags the UI previously juggled. The
//! rules are evaluated top to bottom, first match wins:
//!
//! 1. loading: no view at all (the shell renders a placeholder)
//! 2. session + company + subscription: `App`
//! 3. session without a company or subscription: `PlanSelection`
//! 4. otherwise: `Landing`, unless the user explicitly asked for the
//!    login or register screen
//!
//! An empty company or subscription list is treated exactly like an absent
//! one; "falsy or empty" routes uniformly.

use crate::models::Session;
use crate::resolver::ResolvedTenant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Login,
    Register,
    PlanSelection,
    App,
}

/// Explicit user-initiated navigation from the landing page. These screens
/// are never derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Login,
    Register,
}

pub fn derive_view(
    loading: bool,
    session: Option<&Session>,
    tenant: &ResolvedTenant,
    intent: Option<Intent>,
) -> Option<View> {
    if loading {
        return None;
    }

    if session.is_some() {
        let has_company = tenant.primary_company().is_some();
        let has_subscription = tenant.subscription().is_some();
        if has_company && has_subscription {
            return Some(View::App);
        }
        return Some(View::PlanSelection);
    }

    Some(match intent {
        Some(Intent::Login) => View::Login,
        Some(Intent::Register) => View::Register,
        None => View::Landing,
    })
}
