use std::sync::RwLock;

use originstream_auth::{OriginSource, RegistryError};
use originstream_core::Origin;

/// Mutable in-memory origin table.
///
/// Intended for tests/dev. Changes become visible to the registry on its
/// next reload, the same as edits to the durable table.
#[derive(Debug, Default)]
pub struct InMemoryOriginSource {
    origins: RwLock<Vec<Origin>>,
}

impl InMemoryOriginSource {
    pub fn new(origins: Vec<Origin>) -> Self {
        Self {
            origins: RwLock::new(origins),
        }
    }

    /// Replace the whole table.
    pub fn set(&self, origins: Vec<Origin>) {
        if let Ok(mut guard) = self.origins.write() {
            *guard = origins;
        }
    }

    /// Insert or update one origin by id.
    pub fn upsert(&self, origin: Origin) {
        if let Ok(mut guard) = self.origins.write() {
            match guard.iter_mut().find(|o| o.id == origin.id) {
                Some(existing) => *existing = origin,
                None => guard.push(origin),
            }
        }
    }
}

#[async_trait::async_trait]
impl OriginSource for InMemoryOriginSource {
    async fn load_origins(&self) -> Result<Vec<Origin>, RegistryError> {
        self.origins
            .read()
            .map(|o| o.clone())
            .map_err(|_| RegistryError::Source("lock poisoned".to_string()))
    }
}
