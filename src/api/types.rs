//! Shared types for the API layer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::SessionStore;
use crate::config::SESSION_LIFETIME_SECS;
use crate::core_state::CoreState;

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus the login sessions.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            sessions: Arc::new(Mutex::new(SessionStore::new(Duration::from_secs(
                SESSION_LIFETIME_SECS,
            )))),
        }
    }
}

/// Authenticated user, injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}
