//! Credential loading from environment variables.
//!
//! The API password is only ever read from the environment (or `.env`), never
//! from config.toml.

use crate::errors::{Error, Result};

/// Environment variable holding the API password.
pub const PASSWORD_VAR: &str = "BES_PASSWORD";

/// Static basic-auth credentials for the remote API.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Builds credentials from the configured username and `BES_PASSWORD`.
///
/// # Errors
/// Returns [`Error::EnvVar`] if `BES_PASSWORD` is unset or not valid unicode.
pub fn load_credentials(username: &str) -> Result<Credentials> {
    let password = std::env::var(PASSWORD_VAR)
        .inspect_err(|e| tracing::error!("{} not found: {}", PASSWORD_VAR, e))
        .map_err(Error::EnvVar)?;

    Ok(Credentials {
        username: username.to_string(),
        password,
    })
}
