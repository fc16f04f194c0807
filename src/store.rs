use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{CatalogError, CatalogResult};
use crate::model::{Ship, UNASSIGNED_ID};

/// Persistence contract the catalog service is written against.
///
/// `list` returns ships in the store's native order (ascending id for the
/// stores in this crate). `save` assigns a fresh id when the ship carries
/// `UNASSIGNED_ID` and replaces the stored ship otherwise; replacing a ship
/// that is no longer stored fails with `NotFound`.
pub trait ShipStore: Send + Sync {
    fn list(&self) -> CatalogResult<Vec<Ship>>;
    fn get_by_id(&self, id: u64) -> CatalogResult<Option<Ship>>;
    fn save(&self, ship: Ship) -> CatalogResult<Ship>;
    fn delete(&self, ship: &Ship) -> CatalogResult<()>;
}

/// Volatile store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    ships: BTreeMap<u64, Ship>,
    last_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ShipStore for MemoryStore {
    fn list(&self) -> CatalogResult<Vec<Ship>> {
        let inner = self.inner.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(inner.ships.values().cloned().collect())
    }

    fn get_by_id(&self, id: u64) -> CatalogResult<Option<Ship>> {
        let inner = self.inner.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(inner.ships.get(&id).cloned())
    }

    fn save(&self, mut ship: Ship) -> CatalogResult<Ship> {
        let mut inner = self.inner.write().map_err(|_| CatalogError::Poisoned)?;
        if ship.id == UNASSIGNED_ID {
            inner.last_id += 1;
            ship.id = inner.last_id;
        } else if !inner.ships.contains_key(&ship.id) {
            return Err(CatalogError::NotFound(ship.id));
        }
        inner.ships.insert(ship.id, ship.clone());
        Ok(ship)
    }

    fn delete(&self, ship: &Ship) -> CatalogResult<()> {
        let mut inner = self.inner.write().map_err(|_| CatalogError::Poisoned)?;
        inner.ships.remove(&ship.id);
        Ok(())
    }
}
