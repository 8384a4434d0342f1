//! Session commands for Laurel.
//!
//! The CLI persists the signed-in user id under the Laurel home so
//! successive invocations act as the same identity. Progress commands
//! without a persisted identity fail with a typed outcome instead of
//! guessing a user.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::session_path;
use crate::error::{LaurelError, Result};

/// Persisted identity session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct SessionFile {
    user_id: String,
}

/// Output format for session commands.
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutput {
    /// Whether the command succeeded.
    pub success: bool,
    /// The active user after the command, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Error message if the command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read the persisted active user, if any.
pub fn active_user() -> Option<String> {
    let path = session_path()?;
    active_user_at(&path)
}

fn active_user_at(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let session: SessionFile = serde_json::from_str(&content).ok()?;
    Some(session.user_id)
}

/// Session command implementation.
pub struct LoginCommand {
    session_path: PathBuf,
}

impl LoginCommand {
    /// Create a command using the default session path.
    pub fn new() -> Result<Self> {
        let path = session_path().ok_or_else(|| {
            LaurelError::config("Could not determine session path (no home directory)")
        })?;
        Ok(Self { session_path: path })
    }

    /// Create a command with a custom session path.
    pub fn with_path(session_path: impl Into<PathBuf>) -> Self {
        Self {
            session_path: session_path.into(),
        }
    }

    /// Persist `user_id` as the active identity.
    pub fn login(&self, user_id: &str) -> LoginOutput {
        if user_id.trim().is_empty() {
            return LoginOutput {
                success: false,
                user_id: None,
                error: Some("user id must not be empty".to_string()),
            };
        }

        let session = SessionFile {
            user_id: user_id.to_string(),
        };
        let write = (|| -> Result<()> {
            if let Some(parent) = self.session_path.parent() {
                fs::create_dir_all(parent).map_err(|e| LaurelError::storage(parent, e))?;
            }
            let json = serde_json::to_string_pretty(&session)?;
            fs::write(&self.session_path, json)
                .map_err(|e| LaurelError::storage(&self.session_path, e))?;
            Ok(())
        })();

        match write {
            Ok(()) => LoginOutput {
                success: true,
                user_id: Some(session.user_id),
                error: None,
            },
            Err(err) => LoginOutput {
                success: false,
                user_id: None,
                error: Some(err.to_string()),
            },
        }
    }

    /// Clear the active identity.
    pub fn logout(&self) -> LoginOutput {
        let previous = active_user_at(&self.session_path);
        if self.session_path.exists() {
            if let Err(err) = fs::remove_file(&self.session_path) {
                return LoginOutput {
                    success: false,
                    user_id: previous,
                    error: Some(err.to_string()),
                };
            }
        }
        LoginOutput {
            success: true,
            user_id: None,
            error: None,
        }
    }

    /// Report the active identity.
    pub fn whoami(&self) -> LoginOutput {
        LoginOutput {
            success: true,
            user_id: active_user_at(&self.session_path),
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_login_then_whoami() {
        let temp = TempDir::new().unwrap();
        let cmd = LoginCommand::with_path(temp.path().join("session.json"));

        let output = cmd.login("pat");
        assert!(output.success);
        assert_eq!(output.user_id.as_deref(), Some("pat"));

        let output = cmd.whoami();
        assert_eq!(output.user_id.as_deref(), Some("pat"));
    }

    #[test]
    fn test_logout_clears_identity() {
        let temp = TempDir::new().unwrap();
        let cmd = LoginCommand::with_path(temp.path().join("session.json"));
        cmd.login("pat");

        let output = cmd.logout();
        assert!(output.success);
        assert!(output.user_id.is_none());
        assert!(cmd.whoami().user_id.is_none());
    }

    #[test]
    fn test_logout_without_session_succeeds() {
        let temp = TempDir::new().unwrap();
        let cmd = LoginCommand::with_path(temp.path().join("session.json"));
        assert!(cmd.logout().success);
    }

    #[test]
    fn test_login_rejects_empty_user() {
        let temp = TempDir::new().unwrap();
        let cmd = LoginCommand::with_path(temp.path().join("session.json"));
        let output = cmd.login("  ");
        assert!(!output.success);
        assert!(output.error.is_some());
    }

    #[test]
    fn test_login_replaces_previous_identity() {
        let temp = TempDir::new().unwrap();
        let cmd = LoginCommand::with_path(temp.path().join("session.json"));
        cmd.login("pat");
        cmd.login("alex");
        assert_eq!(cmd.whoami().user_id.as_deref(), Some("alex"));
    }

    #[test]
    fn test_corrupt_session_file_reads_as_no_user() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let cmd = LoginCommand::with_path(&path);
        assert!(cmd.whoami().user_id.is_none());
    }
}
