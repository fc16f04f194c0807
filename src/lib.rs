pub mod error;
pub mod model;
pub mod validator;
pub mod rating;
pub mod query;
pub mod merge;
pub mod store;
pub mod storage;
pub mod service;
pub mod protocol;
pub mod server;
pub mod parser;
pub mod manager;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::model::{Ship, UNASSIGNED_ID};
use crate::storage::{LogEntry, Replay, Segment};
use crate::store::ShipStore;

pub use crate::error::ErrorStatus;
pub use crate::model::{ShipDraft, ShipPatch, ShipType};
pub use crate::query::{ShipCriteria, ShipOrder};
pub use crate::service::ShipService;
pub use crate::store::MemoryStore;

/// Durable ship store: an append-only segment replayed into an in-memory id index.
pub struct ShipyardDb {
    segment: Mutex<Segment>,
    ships: RwLock<BTreeMap<u64, Ship>>,
    last_id: AtomicU64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompactionReport {
    pub live: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl fmt::Debug for ShipyardDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShipyardDb")
        .field("ship_count", &self.ships.read().map(|s| s.len()).unwrap_or(0))
        .field("last_id", &self.last_id.load(Ordering::SeqCst))
        .finish()
    }
}

impl ShipyardDb {
    pub fn open(storage_path: &Path, strict_durability: bool) -> CatalogResult<Self> {
        let mut segment = Segment::new(storage_path, strict_durability)?;
        if segment.is_empty() {
            info!(path = %storage_path.display(), "Starting with an empty segment");
        }

        let Replay { entries, valid_end } = segment.scan()?;
        if valid_end < segment.len() {
            // New frames must not land behind a torn tail.
            warn!(
                dropped_bytes = segment.len() - valid_end,
                valid_end,
                "Truncating torn tail before accepting writes"
            );
            segment.truncate(valid_end)?;
        }

        let mut ships = BTreeMap::new();
        let mut last_id = 0;
        for entry in &entries {
            match entry {
                LogEntry::Put(ship) => {
                    if !validator::is_ship_valid(ship) {
                        warn!(id = ship.id, "Replayed ship fails validation");
                    }
                    last_id = last_id.max(ship.id);
                    ships.insert(ship.id, ship.clone());
                }
                LogEntry::Remove(id) => {
                    ships.remove(id);
                }
                LogEntry::IdFloor(floor) => last_id = last_id.max(*floor),
            }
        }

        info!(
            path = %storage_path.display(),
            entries = entries.len(),
            live = ships.len(),
            last_id,
            "Replayed ship log"
        );

        Ok(Self {
            segment: Mutex::new(segment),
            ships: RwLock::new(ships),
            last_id: AtomicU64::new(last_id),
        })
    }

    pub fn len(&self) -> usize {
        self.ships.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrites the segment so it holds only live ships.
    pub fn compact(&self) -> CatalogResult<CompactionReport> {
        // Writers hold the segment lock, so taking it first stops the world.
        let mut segment_lock = self.segment.lock().map_err(|_| CatalogError::Poisoned)?;
        let ships = self.ships.read().map_err(|_| CatalogError::Poisoned)?;

        let old_path = segment_lock.file_path.clone();
        let new_path = old_path.with_extension("compacted");
        let bytes_before = segment_lock.len();

        info!(live = ships.len(), bytes_before, "Starting compaction");

        // Leftover from an interrupted compaction
        let _ = fs::remove_file(&new_path);

        let bytes_after = {
            let mut fresh = Segment::new(&new_path, false)?;
            fresh.append(&LogEntry::IdFloor(self.last_id.load(Ordering::SeqCst)))?;
            for ship in ships.values() {
                fresh.append(&LogEntry::Put(ship.clone()))?;
            }
            fresh.sync()?;
            fresh.len()
        };

        if let Err(e) = fs::rename(&new_path, &old_path) {
            warn!(error = %e, "Compaction swap failed, keeping old segment");
            let _ = fs::remove_file(&new_path);
            return Err(e.into());
        }

        reopen_segment(&mut segment_lock, &old_path)?;

        info!(bytes_after, "Compaction complete");

        Ok(CompactionReport {
            live: ships.len(),
            bytes_before,
            bytes_after,
        })
    }
}

/// Points `segment` at the file now living at `path`. If that fails the old
/// handle refers to an unlinked file, so it is sealed and every later write errors.
fn reopen_segment(segment: &mut Segment, path: &Path) -> CatalogResult<()> {
    match Segment::new(path, segment.is_strict()) {
        Ok(fresh) => {
            *segment = fresh;
            Ok(())
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Reopen after compaction failed, sealing segment");
            segment.seal();
            Err(e.into())
        }
    }
}

impl ShipStore for ShipyardDb {
    fn list(&self) -> CatalogResult<Vec<Ship>> {
        let ships = self.ships.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(ships.values().cloned().collect())
    }

    fn get_by_id(&self, id: u64) -> CatalogResult<Option<Ship>> {
        let ships = self.ships.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(ships.get(&id).cloned())
    }

    fn save(&self, mut ship: Ship) -> CatalogResult<Ship> {
        let mut segment = self.segment.lock().map_err(|_| CatalogError::Poisoned)?;

        if ship.id == UNASSIGNED_ID {
            ship.id = self.last_id.load(Ordering::SeqCst) + 1;
        } else {
            // A concurrent delete may have won the race since the caller read the ship.
            let ships = self.ships.read().map_err(|_| CatalogError::Poisoned)?;
            if !ships.contains_key(&ship.id) {
                return Err(CatalogError::NotFound(ship.id));
            }
        }

        // The index only changes once the entry is on disk.
        segment.append(&LogEntry::Put(ship.clone()))?;
        self.last_id.fetch_max(ship.id, Ordering::SeqCst);

        let mut ships = self.ships.write().map_err(|_| CatalogError::Poisoned)?;
        ships.insert(ship.id, ship.clone());
        Ok(ship)
    }

    fn delete(&self, ship: &Ship) -> CatalogResult<()> {
        let mut segment = self.segment.lock().map_err(|_| CatalogError::Poisoned)?;
        segment.append(&LogEntry::Remove(ship.id))?;

        let mut ships = self.ships.write().map_err(|_| CatalogError::Poisoned)?;
        ships.remove(&ship.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShipType;
    use tempfile::TempDir;

    fn unsaved(name: &str) -> Ship {
        Ship {
            id: UNASSIGNED_ID,
            name: name.into(),
            planet: "Ganymede".into(),
            ship_type: ShipType::Military,
            prod_date: 0,
            is_used: false,
            speed: 0.5,
            crew_size: 12,
            rating: 0.0,
        }
    }

    #[test]
    fn test_save_of_deleted_ship_is_not_found() {
        let dir = TempDir::new().unwrap();
        let db = ShipyardDb::open(&dir.path().join("ships.dat"), false).unwrap();

        let ship = db.save(unsaved("Nostromo")).unwrap();
        db.delete(&ship).unwrap();

        assert!(matches!(db.save(ship.clone()), Err(CatalogError::NotFound(1))));
        assert!(db.get_by_id(1).unwrap().is_none());
        drop(db);

        let db = ShipyardDb::open(&dir.path().join("ships.dat"), false).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn test_failed_reopen_seals_segment() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::new(&dir.path().join("ships.dat"), false).unwrap();

        let missing = dir.path().join("gone").join("ships.dat");
        assert!(reopen_segment(&mut segment, &missing).is_err());
        assert!(segment.is_sealed());
        assert!(matches!(
            segment.append(&LogEntry::Remove(1)),
            Err(CatalogError::SegmentSealed(_))
        ));
    }
}
