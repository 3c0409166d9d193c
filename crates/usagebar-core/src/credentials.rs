//! Access token lookup for the usage API
//!
//! The token comes from `USAGEBAR_ACCESS_TOKEN` when set, otherwise from the
//! editor's local state database (`state.vscdb`, opened read-only).

use crate::error::CoreError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the stored access token
pub const ACCESS_TOKEN_ENV: &str = "USAGEBAR_ACCESS_TOKEN";

const ACCESS_TOKEN_KEY: &str = "cursorAuth/accessToken";

/// User id and access token used to authenticate API calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub access_token: String,
}

impl Credentials {
    pub fn from_token(access_token: &str) -> Result<Self, CoreError> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(CoreError::InvalidToken {
                reason: "token is empty".to_string(),
            });
        }

        Ok(Self {
            user_id: user_id_from_jwt(access_token)?,
            access_token: access_token.to_string(),
        })
    }

    /// Resolve credentials from the environment, then the state database
    pub fn load(db_path: Option<&Path>) -> Result<Self, CoreError> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            if !token.trim().is_empty() {
                debug!("Using access token from {}", ACCESS_TOKEN_ENV);
                return Self::from_token(&token);
            }
        }

        let path = match db_path {
            Some(path) => path.to_path_buf(),
            None => state_db_path().ok_or_else(missing_token)?,
        };
        if !path.exists() {
            return Err(missing_token());
        }

        let token = read_access_token(&path)?.ok_or_else(missing_token)?;
        Self::from_token(&token)
    }

    /// Cookie header value expected by the usage API
    pub fn cookie(&self) -> String {
        format!(
            "WorkosCursorSessionToken={}::{}",
            self.user_id, self.access_token
        )
    }
}

/// Default location of the editor state database
///
/// `<config_dir>/Cursor/User/globalStorage/state.vscdb`, where the config dir is
/// `~/.config`, `~/Library/Application Support` or `%APPDATA%`.
pub fn state_db_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| {
        dir.join("Cursor")
            .join("User")
            .join("globalStorage")
            .join("state.vscdb")
    })
}

/// Read the stored access token, None when the key is absent or blank
pub fn read_access_token(db_path: &Path) -> Result<Option<String>, CoreError> {
    let db_err = |source| CoreError::Database {
        path: db_path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(db_err)?;

    let token: Option<String> = conn
        .query_row(
            "SELECT value FROM ItemTable WHERE key = ?1",
            [ACCESS_TOKEN_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;

    Ok(token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty()))
}

/// Extract the user id from a JWT's `sub` claim
///
/// The claim looks like `auth-provider|user_xxxx`; the last segment is the id.
pub fn user_id_from_jwt(token: &str) -> Result<String, CoreError> {
    let invalid = |reason: &str| CoreError::InvalidToken {
        reason: reason.to_string(),
    };

    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| invalid("not a JWT"))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| invalid(&format!("payload is not base64: {e}")))?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded)
        .map_err(|e| invalid(&format!("payload is not JSON: {e}")))?;

    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid("missing sub claim"))?;

    sub.rsplit('|')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| invalid("empty sub claim"))
}

fn missing_token() -> CoreError {
    CoreError::MissingCapability {
        capability: "Cursor access token".to_string(),
        hint: format!(
            "Sign in to Cursor on this machine or set {}",
            ACCESS_TOKEN_ENV
        ),
    }
}
