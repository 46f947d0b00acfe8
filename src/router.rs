//! Route table and navigation guard.
//!
//! The guard is a UX convenience: it decides where a client should land, it
//! does not enforce anything. Real access control lives on the API.

use crate::session::AuthController;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Route {
    pub name: &'static str,
    pub path: &'static str,
    pub requires_auth: bool,
}

impl Route {
    pub const HOME: Self = Self {
        name: "home",
        path: "/",
        requires_auth: true,
    };

    pub const LOGIN: Self = Self {
        name: "login",
        path: "/login",
        requires_auth: false,
    };

    pub const ALL: [Self; 2] = [Self::HOME, Self::LOGIN];

    /// Looks up a route by path, ignoring a trailing slash.
    #[must_use]
    pub fn resolve(path: &str) -> Option<Self> {
        let path = path.trim();
        let normalized = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Self::ALL
            .into_iter()
            .find(|route| route.path == normalized)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Route),
}

/// Where to go given the target and the current authentication status.
#[must_use]
pub fn decide(to: &Route, authenticated: bool) -> GuardDecision {
    if to.requires_auth && !authenticated {
        GuardDecision::Redirect(Route::LOGIN)
    } else if *to == Route::LOGIN && authenticated {
        GuardDecision::Redirect(Route::HOME)
    } else {
        GuardDecision::Allow
    }
}

/// Moves the host to another surface.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
}

/// Navigator for hosts without a UI: records the move in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &Route) {
        info!(route = route.name, path = route.path, "Navigate");
    }
}

/// Runs before each navigation. Owns no state beyond the controller handle.
#[derive(Clone, Debug)]
pub struct RouteGuard {
    controller: AuthController,
}

impl RouteGuard {
    #[must_use]
    pub fn new(controller: AuthController) -> Self {
        Self { controller }
    }

    /// Checks authentication (restoring a durable session if needed) and
    /// decides whether the navigation to `to` proceeds.
    pub fn before_each(&self, to: &Route) -> GuardDecision {
        let authenticated = self.controller.check_auth();
        let decision = decide(to, authenticated);
        debug!(to = to.path, authenticated, ?decision, "Route guard");
        decision
    }
}
