use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ConfigError;

// Upstream API keys used round-robin, one per outgoing call

#[derive(Debug)]
pub struct ApiKeyRing {
    keys: Vec<String>,
    current: AtomicUsize,
}

impl ApiKeyRing {
    pub fn new<I, S>(keys: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string()) // remove spaces
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(ConfigError::NoUpstreamKeys);
        }

        Ok(Self {
            keys,
            current: AtomicUsize::new(0),
        })
    }

    // Next key in rotation
    pub fn next(&self) -> &str {
        let idx = self.current.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[idx]
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
