use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{CsrfError, Result};

/// Number of random bytes behind every token (128 bits).
const SEED_BYTES: usize = 16;

/// Produces unguessable token strings.
///
/// Storages accept any implementation, so a type that cannot generate
/// tokens is rejected by the compiler instead of at request time.
#[cfg_attr(test, mockall::automock)]
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

impl<T: TokenGenerator + ?Sized> TokenGenerator for Box<T> {
    fn generate(&self) -> String {
        (**self).generate()
    }
}

fn random_hex() -> String {
    let mut bytes = [0u8; SEED_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Fresh random token, hex encoded, no server secret involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenGenerator;

impl TokenGenerator for SimpleTokenGenerator {
    fn generate(&self) -> String {
        random_hex()
    }
}

/// SHA-256 of a fresh random seed concatenated with a server secret.
#[derive(Clone)]
pub struct HashedTokenGenerator {
    secret_phrase: String,
}

impl std::fmt::Debug for HashedTokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashedTokenGenerator")
            .field("secret_phrase", &"[REDACTED]")
            .finish()
    }
}

impl HashedTokenGenerator {
    pub fn new(secret_phrase: impl Into<String>) -> Result<Self> {
        let secret_phrase = secret_phrase.into();
        if secret_phrase.trim().is_empty() {
            return Err(CsrfError::Configuration(
                "HashedTokenGenerator requires a non-empty secret phrase".to_string(),
            ));
        }

        Ok(Self { secret_phrase })
    }

    fn hash_seed(&self, seed: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(seed.as_bytes());
        hasher.update(self.secret_phrase.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl TokenGenerator for HashedTokenGenerator {
    fn generate(&self) -> String {
        self.hash_seed(&random_hex())
    }
}
