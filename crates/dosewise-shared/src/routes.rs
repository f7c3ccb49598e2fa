//! Client-side navigation contract.
//!
//! `/` and `/auth/*` are public, `/patient/*` needs a patient profile and
//! `/clinic/*` needs a clinic profile.  Denied navigation redirects instead of
//! erroring.

use uuid::Uuid;

use crate::auth::AuthState;
use crate::constants::{ROUTE_CLINIC_DASHBOARD, ROUTE_PATIENT_DASHBOARD, ROUTE_PROFILE_CHOICE};
use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    Patient,
    Clinic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    /// Session check still in flight; render nothing yet.
    Wait,
    Redirect(&'static str),
    /// Signed in, but the profile row is missing.  Recoverable by retrying the
    /// profile fetch.
    ProfileMissing { user_id: Uuid },
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Classify a path.  Anything outside the patient and clinic areas is public.
pub fn route_access(path: &str) -> RouteAccess {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if under(path, "/patient") {
        RouteAccess::Patient
    } else if under(path, "/clinic") {
        RouteAccess::Clinic
    } else {
        RouteAccess::Public
    }
}

/// Landing page for a signed-in role.
pub fn home_for(role: Role) -> &'static str {
    match role {
        Role::Patient => ROUTE_PATIENT_DASHBOARD,
        Role::Clinic => ROUTE_CLINIC_DASHBOARD,
    }
}

/// Decide what happens when `state` navigates to `path`.
pub fn guard(path: &str, state: &AuthState) -> Navigation {
    let required = match route_access(path) {
        RouteAccess::Public => return Navigation::Allow,
        RouteAccess::Patient => Role::Patient,
        RouteAccess::Clinic => Role::Clinic,
    };

    match state {
        AuthState::Loading => Navigation::Wait,
        AuthState::Unauthenticated => Navigation::Redirect(ROUTE_PROFILE_CHOICE),
        AuthState::ProfileMissing { user_id } => Navigation::ProfileMissing { user_id: *user_id },
        AuthState::Authenticated { profile } if profile.role == required => Navigation::Allow,
        AuthState::Authenticated { profile } => Navigation::Redirect(home_for(profile.role)),
    }
}
