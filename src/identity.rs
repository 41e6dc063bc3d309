//! Identity provider seam
//!
//! Signing in yields an opaque [`UserId`] that scopes the saved-location
//! collection. The local provider takes the user from configuration.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

use crate::config::IdentityConfig;
use crate::models::UserId;
use crate::{HydrocastError, Result};

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self) -> Result<UserId>;
    async fn sign_out(&self) -> Result<()>;
    fn current_user(&self) -> Option<UserId>;
}

/// Provider for a single configured local user
pub struct LocalIdentity {
    configured: Option<UserId>,
    session: Mutex<Option<UserId>>,
}

impl LocalIdentity {
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        let configured = config
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| UserId(id.to_string()));
        Self {
            configured,
            session: Mutex::new(None),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_in(&self) -> Result<UserId> {
        let user = self.configured.clone().ok_or_else(|| {
            HydrocastError::auth(
                "No user configured. Set identity.user_id or HYDROCAST_IDENTITY__USER_ID.",
            )
        })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| HydrocastError::auth("Session state poisoned"))?;
        *session = Some(user.clone());
        info!("Signed in as {}", user);
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| HydrocastError::auth("Session state poisoned"))?;
        if let Some(user) = session.take() {
            info!("Signed out {}", user);
        }
        Ok(())
    }

    fn current_user(&self) -> Option<UserId> {
        self.session.lock().ok().and_then(|session| session.clone())
    }
}
