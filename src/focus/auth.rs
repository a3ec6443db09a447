use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::focus::error::AuthorizationError;

/// Whether the restriction capability has been granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Denied,
    Approved,
}

impl AuthorizationStatus {
    pub fn is_approved(self) -> bool {
        self == AuthorizationStatus::Approved
    }
}

/// Host side of the authorization handshake
pub trait AuthorizationBoundary: Send + Sync {
    /// Ask the host for the restriction capability. May block.
    fn request_authorization(&self) -> Result<AuthorizationStatus, AuthorizationError>;
}

/// Process-wide authorization status with change notifications.
///
/// Subscribers receive statuses in the order they change; publishing the
/// current status again does not wake them.
pub struct AuthorizationState {
    boundary: Arc<dyn AuthorizationBoundary>,
    status_tx: watch::Sender<AuthorizationStatus>,
}

impl AuthorizationState {
    pub fn new(boundary: Arc<dyn AuthorizationBoundary>) -> Self {
        let (status_tx, _) = watch::channel(AuthorizationStatus::NotDetermined);
        Self { boundary, status_tx }
    }

    /// Latest known status, without blocking
    pub fn current_status(&self) -> AuthorizationStatus {
        *self.status_tx.borrow()
    }

    /// Stream of status changes
    pub fn subscribe(&self) -> watch::Receiver<AuthorizationStatus> {
        self.status_tx.subscribe()
    }

    /// Record a status pushed by the host. Returns whether it changed.
    pub fn publish(&self, status: AuthorizationStatus) -> bool {
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });

        if changed {
            info!("Authorization status changed to {:?}", status);
        }
        changed
    }

    /// Request the capability from the host.
    ///
    /// Approval moves the status to `Approved`. A denial is recorded and
    /// reported. A host failure leaves the status unchanged.
    pub async fn request_authorization(&self) -> Result<AuthorizationStatus, AuthorizationError> {
        let boundary = self.boundary.clone();

        let outcome = tokio::task::spawn_blocking(move || boundary.request_authorization())
            .await
            .map_err(|e| AuthorizationError::Host(format!("authorization task failed: {}", e)))?;

        match outcome {
            Ok(AuthorizationStatus::Approved) => {
                self.publish(AuthorizationStatus::Approved);
                Ok(AuthorizationStatus::Approved)
            }
            Ok(AuthorizationStatus::Denied) | Err(AuthorizationError::Denied) => {
                self.publish(AuthorizationStatus::Denied);
                Err(AuthorizationError::Denied)
            }
            Ok(AuthorizationStatus::NotDetermined) => {
                debug!("Host left authorization undetermined");
                Ok(self.current_status())
            }
            Err(e) => {
                warn!("Authorization request failed: {}", e);
                Err(e)
            }
        }
    }
}

/// Grant recorded as a file written by `free-focus authorize`
pub struct GrantFileAuthorizer {
    path: PathBuf,
}

/// Contents of the grant file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Grant {
    pub granted_at: chrono::DateTime<chrono::Utc>,
    pub granted_by: String,
}

impl GrantFileAuthorizer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the user's consent
    pub fn grant(&self) -> Result<Grant> {
        let grant = Grant {
            granted_at: chrono::Utc::now(),
            granted_by: current_username(),
        };

        let content = serde_json::to_string_pretty(&grant).context("Failed to serialize grant")?;

        crate::platform::common::atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write grant file: {}", self.path.display()))?;

        Ok(grant)
    }

    /// Withdraw consent. Returns whether a grant existed.
    pub fn revoke(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        std::fs::remove_file(&self.path)
            .with_context(|| format!("Failed to delete grant file: {}", self.path.display()))?;
        Ok(true)
    }

    /// Read the grant, if one exists
    pub fn load(&self) -> Result<Option<Grant>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read grant file: {}", self.path.display()))?;

        let grant = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse grant file: {}", self.path.display()))?;

        Ok(Some(grant))
    }
}

impl AuthorizationBoundary for GrantFileAuthorizer {
    fn request_authorization(&self) -> Result<AuthorizationStatus, AuthorizationError> {
        match self.load() {
            Ok(Some(grant)) => {
                debug!("Restriction capability granted by {} at {}", grant.granted_by, grant.granted_at);
                Ok(AuthorizationStatus::Approved)
            }
            Ok(None) => Ok(AuthorizationStatus::Denied),
            Err(e) => Err(AuthorizationError::Host(format!("{:#}", e))),
        }
    }
}

/// Get the current OS username
fn current_username() -> String {
    #[cfg(target_os = "windows")]
    let var = "USERNAME";

    #[cfg(not(target_os = "windows"))]
    let var = "USER";

    std::env::var(var).unwrap_or_else(|_| "unknown".to_string())
}
