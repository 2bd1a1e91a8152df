// BackendRegistry: backend id -> Bridge mapping
//
// Locks are held only for the single map operation. resolve() hands out an
// Arc so callers never hold the registry lock while a bridge runs its own
// transition, keeping unrelated backends independent.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::info;

use crate::bridge::Bridge;
use crate::error::BridgeError;

/// Registry of live synthesis backends
///
/// Deregistration does not fence callbacks already in flight for that
/// backend: a callback that resolved the bridge before removal still
/// completes against it. Callers deregister only once the engine has
/// stopped delivering callbacks for the backend.
#[derive(Default)]
pub struct BackendRegistry {
    bridges: RwLock<HashMap<u32, Arc<Bridge>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<u32, Arc<Bridge>>>, BridgeError> {
        self.bridges.read().map_err(|_| BridgeError::LockPoisoned {
            component: "backend_registry".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<u32, Arc<Bridge>>>, BridgeError> {
        self.bridges.write().map_err(|_| BridgeError::LockPoisoned {
            component: "backend_registry".to_string(),
        })
    }

    /// Register a bridge under its own backend id
    ///
    /// # Errors
    /// `DuplicateBackend` if the id is already registered.
    pub fn register(&self, bridge: Bridge) -> Result<Arc<Bridge>, BridgeError> {
        let backend_id = bridge.backend_id();
        let mut bridges = self.write()?;
        if bridges.contains_key(&backend_id) {
            return Err(BridgeError::DuplicateBackend { backend_id });
        }
        let bridge = Arc::new(bridge);
        bridges.insert(backend_id, Arc::clone(&bridge));
        info!("[Registry] Registered TTS backend {}", backend_id);
        Ok(bridge)
    }

    pub fn resolve(&self, backend_id: u32) -> Result<Arc<Bridge>, BridgeError> {
        self.read()?
            .get(&backend_id)
            .cloned()
            .ok_or(BridgeError::UnknownBackend { backend_id })
    }

    /// Remove a backend, returning its bridge
    ///
    /// # Errors
    /// `UnknownBackend` if the id is not registered.
    pub fn deregister(&self, backend_id: u32) -> Result<Arc<Bridge>, BridgeError> {
        let removed = self
            .write()?
            .remove(&backend_id)
            .ok_or(BridgeError::UnknownBackend { backend_id })?;
        info!("[Registry] Deregistered TTS backend {}", backend_id);
        Ok(removed)
    }

    /// Registered backend ids in ascending order
    pub fn backend_ids(&self) -> Result<Vec<u32>, BridgeError> {
        let mut ids: Vec<u32> = self.read()?.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    pub fn len(&self) -> usize {
        self.read().map(|bridges| bridges.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
