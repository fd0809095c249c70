use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use bugfix_core::identity::Identity;

use crate::error::ActionError;

/// Remembers the first credential presented for each player name.
///
/// Only digests are kept. When disabled every identity is accepted as-is and
/// authorization happens purely per game.
pub struct PlayerDirectory {
    enabled: bool,
    digests: Mutex<HashMap<String, String>>,
}

fn credential_digest(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

impl PlayerDirectory {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            digests: Mutex::new(HashMap::new()),
        }
    }

    /// Register `identity` on first sight, otherwise check its credential.
    pub async fn check(&self, identity: &Identity) -> Result<(), ActionError> {
        if !self.enabled {
            return Ok(());
        }
        let digest = credential_digest(&identity.credential);
        let mut digests = self.digests.lock().await;
        match digests.get(&identity.name) {
            Some(known) if *known == digest => Ok(()),
            Some(_) => Err(ActionError::BadCredentials),
            None => {
                tracing::info!(player = %identity.name, "Registered new player");
                digests.insert(identity.name.clone(), digest);
                Ok(())
            },
        }
    }

    pub async fn len(&self) -> usize {
        self.digests.lock().await.len()
    }
}
