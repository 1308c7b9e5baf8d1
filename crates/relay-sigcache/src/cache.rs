use std::sync::Arc;
use std::time::Duration;

use mini_moka::sync::Cache;
use sha2::{Digest, Sha256};

/// Sliding TTL for cached signatures
const TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Maximum number of cached signatures
const CAPACITY: u64 = 4096;

/// Content-addressed signature store shared by all request handlers
///
/// Keys are `sig:{family}:{sha256(text)[..16]}`; the TTL slides on
/// every read so active conversations never expire mid-flight, and the
/// capacity bound evicts the least-recently-used entries.
#[derive(Clone)]
pub struct SignatureCache {
    cache: Cache<String, Arc<str>>,
}

impl SignatureCache {
    /// Create a cache with the default TTL and capacity
    pub fn new() -> Self {
        Self::with_capacity(CAPACITY)
    }

    /// Create a cache bounded to `capacity` entries
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_idle(TTL)
                .max_capacity(capacity)
                .build(),
        }
    }

    /// Look up the signature cached for this thinking text
    pub fn get(&self, family: &str, thinking_text: &str) -> Option<Arc<str>> {
        self.cache.get(&cache_key(family, thinking_text))
    }

    /// Store a provider-issued signature
    pub fn set(&self, family: &str, thinking_text: &str, signature: &str) {
        let key = cache_key(family, thinking_text);
        tracing::debug!(family, key = %key, "caching thinking signature");
        self.cache.insert(key, Arc::from(signature));
    }

    /// Number of live entries (approximate, for diagnostics)
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SignatureCache {
    fn default() -> Self {
        Self::new()
    }
}

fn cache_key(family: &str, thinking_text: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(thinking_text.as_bytes()));
    format!("sig:{family}:{}", &digest[..16])
}
