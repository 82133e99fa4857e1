//! Client for the job-search assistant API.
//!
//! `SessionStore` owns the authentication state, `Gateway` carries every data
//! call (bearer injection plus a single refresh-and-resend on 401), and
//! `RouteGuard` turns the session into navigation decisions.

pub mod auth_api;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod guard;
pub mod models;
pub mod session;
pub mod state;
pub mod wire;

pub use errors::ClientError;
pub use gateway::{Gateway, OutboundRequest};
pub use guard::{AuthStatus, GuardKind, GuardRoutes, Navigation, RouteGuard};
pub use session::{Session, SessionStore};
pub use state::ClientState;
