//! Credential validation: (key, secret) to [`Identity`] or a denial.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::{AuthError, Identity, SECRET_PREFIX, fingerprint, hasher::SecretHasher};
use crate::{
    models::api_key::KeyStatus,
    store::{CredentialStore, LookupField, StoreError},
};

/// Checks presented credentials against the store.
#[derive(Clone)]
pub struct CredentialValidator {
    store: Arc<dyn CredentialStore>,
    hasher: SecretHasher,
}

impl CredentialValidator {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: SecretHasher) -> Self {
        Self { store, hasher }
    }

    /// Validates a presented key/secret pair.
    ///
    /// # Flow
    ///
    /// 1. Strip the `as_` prefix from the secret
    /// 2. Exact lookup on `api_key`; no match or several matches is
    ///    [`AuthError::InvalidKey`], after a verify against the decoy hash
    /// 3. Verify against the stored hash
    /// 4. Require `status == active`
    ///
    /// Steps 3 and 4 fail with the same [`AuthError::InvalidCredentials`].
    /// Any other store failure is [`AuthError::TransientFailure`]. Nothing is retried.
    pub async fn validate(
        &self,
        presented_key: &str,
        presented_secret: &str,
    ) -> Result<Identity, AuthError> {
        let key_fp = fingerprint(presented_key);
        let secret = presented_secret
            .strip_prefix(SECRET_PREFIX)
            .unwrap_or(presented_secret);

        let record = match self
            .store
            .find_one_by_field(LookupField::ApiKey, presented_key)
            .await
        {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => {
                debug!(key_fp = %key_fp, "unknown api key");
                self.hasher.verify_decoy(secret.to_string()).await;
                return Err(AuthError::InvalidKey);
            }
            Err(StoreError::Ambiguous { count, .. }) => {
                error!(key_fp = %key_fp, count, "api key matches several credentials");
                self.hasher.verify_decoy(secret.to_string()).await;
                return Err(AuthError::InvalidKey);
            }
            Err(e) => {
                warn!(key_fp = %key_fp, error = %e, "credential lookup failed");
                return Err(AuthError::TransientFailure);
            }
        };

        let secret_ok = self
            .hasher
            .verify_async(secret.to_string(), record.hashed_secret.clone())
            .await
            .map_err(|e| {
                error!(error = %e, "secret verification task failed");
                AuthError::Internal
            })?;

        if !secret_ok {
            debug!(key_fp = %key_fp, credential_id = %record.id, "secret mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if record.status != KeyStatus::Active {
            debug!(
                key_fp = %key_fp,
                credential_id = %record.id,
                status = %record.status,
                "credential not active"
            );
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Identity {
            credential_id: record.id,
            user_id: record.user_id,
            permissions: record.permissions,
        })
    }
}
