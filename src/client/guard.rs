// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route guard.
//!
//! Decides what a guarded route shows for the current [`SessionState`]:
//!
//! | Session | Decision |
//! |---------|----------|
//! | `loading` | [`GuardDecision::Pending`] |
//! | not authenticated | [`GuardDecision::RedirectLogin`] |
//! | not authorized, or no identity | [`GuardDecision::RedirectLogin`] |
//! | role outside the route's allow-list | [`GuardDecision::RedirectError`] |
//! | otherwise | [`GuardDecision::Render`] |

use std::collections::{HashMap, HashSet};

use super::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Pending,
    RedirectLogin,
    RedirectError,
    Render,
}

/// Case-insensitive role allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(HashSet<String>);

impl RoleSet {
    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(&role.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|r| r.as_ref().to_lowercase()).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    required_roles: Option<RoleSet>,
}

impl RouteGuard {
    /// Any authorized user may enter.
    pub fn authorized() -> Self {
        Self::default()
    }

    /// Only users whose role is in `roles` may enter.
    pub fn with_roles(roles: RoleSet) -> Self {
        Self {
            required_roles: Some(roles),
        }
    }

    pub fn decide(&self, session: &SessionState) -> GuardDecision {
        if session.loading {
            return GuardDecision::Pending;
        }
        if !session.authenticated {
            return GuardDecision::RedirectLogin;
        }
        let Some(identity) = session.identity.as_ref().filter(|_| session.authorized) else {
            return GuardDecision::RedirectLogin;
        };

        match &self.required_roles {
            Some(roles) => match identity.role.as_deref() {
                Some(role) if roles.contains(role) => GuardDecision::Render,
                _ => GuardDecision::RedirectError,
            },
            None => GuardDecision::Render,
        }
    }
}

/// Guards by route path. Paths without an entry require an authorized user.
#[derive(Debug, Clone, Default)]
pub struct GuardTable {
    routes: HashMap<String, RouteGuard>,
}

impl GuardTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: impl Into<String>, guard: RouteGuard) -> Self {
        self.routes.insert(path.into(), guard);
        self
    }

    pub fn decide(&self, path: &str, session: &SessionState) -> GuardDecision {
        match self.routes.get(path) {
            Some(guard) => guard.decide(session),
            None => RouteGuard::authorized().decide(session),
        }
    }
}
