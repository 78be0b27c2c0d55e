use chrono::Utc;
use rand::Rng;
use tracing::{debug, info};

use parley_types::models::Identity;

use crate::error::Result;
use crate::store::KeyValueStore;

/// Store key the identity lives under.
pub const IDENTITY_KEY: &str = "session_id";

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Hands out the local identity, generating and persisting it on first use.
pub struct IdentityHolder<S> {
    store: S,
}

impl<S: KeyValueStore> IdentityHolder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the stored identity, or generates, stores and returns a new one.
    /// An empty stored value counts as absent.
    pub fn resolve(&self) -> Result<Identity> {
        if let Some(existing) = self.store.get(IDENTITY_KEY)? {
            if !existing.is_empty() {
                debug!("Using stored identity {}", existing);
                return Ok(Identity::new(existing));
            }
        }

        let identity = generate_identity();
        self.store.set(IDENTITY_KEY, identity.as_str())?;
        info!("Generated new identity {}", identity);
        Ok(identity)
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

/// `session-<unix millis>-<9 base36 chars>`
pub fn generate_identity() -> Identity {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    Identity::new(format!("session-{}-{}", Utc::now().timestamp_millis(), suffix))
}
