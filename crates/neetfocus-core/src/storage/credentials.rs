//! API token storage in the OS keyring.
//!
//! `NEETFOCUS_TOKEN` takes precedence over the keyring so scripts and CI can
//! run without a keyring daemon.

use crate::error::CredentialError;

const SERVICE: &str = "neetfocus";
const TOKEN_KEY: &str = "api_token";

/// Environment variable checked before the keyring.
pub const TOKEN_ENV: &str = "NEETFOCUS_TOKEN";

fn entry(key: &str) -> Result<keyring::Entry, CredentialError> {
    Ok(keyring::Entry::new(SERVICE, key)?)
}

/// Where a loaded token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Env,
    Keyring,
}

/// Current API token, if any.
pub fn load_token() -> Result<Option<(String, TokenSource)>, CredentialError> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            return Ok(Some((token.trim().to_string(), TokenSource::Env)));
        }
    }
    match entry(TOKEN_KEY)?.get_password() {
        Ok(token) => Ok(Some((token, TokenSource::Keyring))),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_token(token: &str) -> Result<(), CredentialError> {
    entry(TOKEN_KEY)?.set_password(token)?;
    Ok(())
}

/// Remove the stored token. Returns false if none was stored.
pub fn delete_token() -> Result<bool, CredentialError> {
    match entry(TOKEN_KEY)?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
