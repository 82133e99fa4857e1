//! Route guards — a pure projection of the session onto navigation decisions.
//!
//! Nothing here is stored: every check re-reads the current session, so the
//! guard follows login, refresh failure and logout without extra wiring.

use crate::session::{Session, SessionStore};

/// Where the session stands, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

impl AuthStatus {
    /// Loading wins over everything; otherwise the authenticated flag decides.
    pub fn of(session: &Session) -> Self {
        if session.is_loading {
            AuthStatus::Loading
        } else if session.is_authenticated {
            AuthStatus::Authenticated
        } else {
            AuthStatus::Unauthenticated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Pages that need a signed-in user.
    Protected,
    /// Login and registration screens.
    PublicOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Show a neutral waiting state.
    Wait,
    Render,
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRoutes {
    pub public_entry: String,
    pub authenticated_landing: String,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self {
            public_entry: "/login".to_string(),
            authenticated_landing: "/dashboard".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    kind: GuardKind,
    routes: GuardRoutes,
}

impl RouteGuard {
    pub fn new(kind: GuardKind, routes: GuardRoutes) -> Self {
        Self { kind, routes }
    }

    pub fn protected() -> Self {
        Self::new(GuardKind::Protected, GuardRoutes::default())
    }

    pub fn public_only() -> Self {
        Self::new(GuardKind::PublicOnly, GuardRoutes::default())
    }

    pub fn kind(&self) -> GuardKind {
        self.kind
    }

    pub fn decide(&self, session: &Session) -> Navigation {
        match (self.kind, AuthStatus::of(session)) {
            (_, AuthStatus::Loading) => Navigation::Wait,
            (GuardKind::Protected, AuthStatus::Authenticated)
            | (GuardKind::PublicOnly, AuthStatus::Unauthenticated) => Navigation::Render,
            (GuardKind::Protected, AuthStatus::Unauthenticated) => {
                Navigation::Redirect(self.routes.public_entry.clone())
            }
            (GuardKind::PublicOnly, AuthStatus::Authenticated) => {
                Navigation::Redirect(self.routes.authenticated_landing.clone())
            }
        }
    }

    /// Decides against the store's current state.
    pub fn check(&self, store: &SessionStore) -> Navigation {
        self.decide(&store.snapshot())
    }
}
