//! Write and read workflows

use std::sync::Arc;
use tracing::{debug, info, warn};

use secretshare_core::{Clock, NewSecret, RequestId, Secret, ShareError};

use crate::repository::{Removal, SecretRepository};

pub struct SecretService {
    repository: SecretRepository,
    clock: Arc<dyn Clock>,
}

impl SecretService {
    pub fn new(repository: SecretRepository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub fn store_name(&self) -> &'static str {
        self.repository.store_name()
    }

    /// Store a new secret and return its id. The id comes from the request,
    /// never from the body.
    pub async fn write(&self, request_id: &RequestId, body: &[u8]) -> Result<String, ShareError> {
        let secret_id = request_id.secret_id();
        let submission = NewSecret::from_json(body)?;

        let now = self.clock.now();
        let secret = Secret::create(secret_id, submission, now);
        info!(
            secret_id = %secret.secret_id,
            now = now.timestamp(),
            active_duration = %secret.active_duration,
            expiration_time = secret.expiration_time,
            "Writing secret"
        );

        self.repository.insert(&secret).await?;

        info!(secret_id = %secret.secret_id, "Secret added");
        Ok(secret.secret_id)
    }

    /// Return the message of a live secret with a matching key and delete it.
    ///
    /// Missing, expired, wrong-key and already-read secrets all fail with
    /// `SecretUnavailable`, as do query failures.
    pub async fn read(&self, secret_id: &str, secret_key: &str) -> Result<String, ShareError> {
        let now = self.clock.unix_now();
        debug!(secret_id = %secret_id, now, "Reading secret");

        let secret = self
            .repository
            .find_live(secret_id, secret_key, now)
            .await
            .map_err(ShareError::conceal)?
            .ok_or_else(|| ShareError::secret_unavailable("no live secret matched"))?;

        info!(
            secret_id = %secret.secret_id,
            expiration_time = secret.expiration_time,
            "Secret retrieved"
        );

        match self.repository.remove(&secret).await {
            Ok(Removal::Removed) => {
                info!(secret_id = %secret.secret_id, "Secret deleted after read");
            }
            Ok(Removal::AlreadyGone) => {
                info!(secret_id = %secret.secret_id, "Secret was read concurrently");
                return Err(ShareError::secret_unavailable(
                    "another reader deleted the secret first",
                ));
            }
            Err(e) => {
                warn!(secret_id = %secret.secret_id, error = %e, "Failed to delete secret after read");
            }
        }

        Ok(secret.message)
    }
}
