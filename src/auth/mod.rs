//! Credential store and login sessions.

pub mod password;
pub mod session;

use rusqlite::Connection;
use thiserror::Error;

use crate::config::DEFAULT_ADMIN_USERNAME;
use crate::db::repository::{count_users, get_user_by_username, insert_user};
use crate::db::DatabaseError;
use crate::models::User;

pub use password::{hash_password, verify_password};
pub use session::{SessionStore, SessionUser};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Malformed password hash")]
    MalformedHash,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Seed the default admin when the credential store is empty.
/// Returns whether a user was created.
pub fn ensure_default_admin(conn: &Connection, password: &str) -> Result<bool, AuthError> {
    if count_users(conn)? > 0 {
        return Ok(false);
    }
    insert_user(conn, DEFAULT_ADMIN_USERNAME, &hash_password(password))?;
    tracing::info!(username = DEFAULT_ADMIN_USERNAME, "Default admin user created");
    Ok(true)
}

/// Check a login attempt against the stored hash.
///
/// Unknown users and wrong passwords fail identically.
pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<User, AuthError> {
    let Some(user) = get_user_by_username(conn, username.trim())? else {
        tracing::warn!("Login rejected: unknown user");
        return Err(AuthError::InvalidCredentials);
    };
    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "Login rejected: wrong password");
        return Err(AuthError::InvalidCredentials);
    }
    Ok(user)
}
