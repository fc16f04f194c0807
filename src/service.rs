//! The catalog call contract: list, count, get, create, update, delete.
//!
//! Every mutation is validated in full before the store is touched.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::merge::merge;
use crate::model::{Ship, ShipDraft, ShipPatch, UNASSIGNED_ID};
use crate::query::{self, ShipCriteria, ShipOrder};
use crate::rating::compute_rating;
use crate::store::ShipStore;
use crate::validator;

/// Parses a raw identifier from the transport. Anything other than a positive
/// integer is `InvalidIdentifier`.
pub fn parse_id(raw: Option<&str>) -> CatalogResult<u64> {
    let raw = raw.ok_or_else(|| CatalogError::InvalidIdentifier(String::new()))?;
    match raw.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CatalogError::InvalidIdentifier(raw.to_string())),
    }
}

fn check_id(id: u64) -> CatalogResult<u64> {
    if id == UNASSIGNED_ID {
        return Err(CatalogError::InvalidIdentifier(id.to_string()));
    }
    Ok(id)
}

#[derive(Debug)]
pub struct ShipService<S> {
    store: Arc<S>,
}

impl<S> Clone for ShipService<S> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone() }
    }
}

impl<S: ShipStore> ShipService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// filter, then sort, then page.
    pub fn list_ships(
        &self,
        criteria: &ShipCriteria,
        order: ShipOrder,
        page_number: Option<usize>,
        page_size: Option<usize>,
    ) -> CatalogResult<Vec<Ship>> {
        let all = self.store.list()?;
        let total = all.len();

        let matching = query::filter(all, criteria);
        let matched = matching.len();
        let page = query::page(query::sort(matching, order), page_number, page_size);

        debug!(total, matched, returned = page.len(), ?order, "Listed ships");
        Ok(page)
    }

    pub fn count_ships(&self, criteria: &ShipCriteria) -> CatalogResult<usize> {
        Ok(query::count(&self.store.list()?, criteria))
    }

    pub fn get_ship(&self, id: u64) -> CatalogResult<Option<Ship>> {
        self.store.get_by_id(check_id(id)?)
    }

    pub fn create_ship(&self, draft: ShipDraft) -> CatalogResult<Ship> {
        if let Some(field) = validator::first_invalid_field(&draft) {
            return Err(CatalogError::InvalidRecord { field });
        }

        let (Some(name), Some(planet), Some(ship_type), Some(prod_date), Some(speed), Some(crew_size)) = (
            draft.name,
            draft.planet,
            draft.ship_type,
            draft.prod_date,
            draft.speed,
            draft.crew_size,
        ) else {
            return Err(CatalogError::InvalidRecord { field: "draft" });
        };
        let is_used = draft.is_used.unwrap_or(false);

        let rating = compute_rating(speed, is_used, prod_date)?;
        let ship = self.store.save(Ship {
            id: UNASSIGNED_ID,
            name,
            planet,
            ship_type,
            prod_date,
            is_used,
            speed,
            crew_size,
            rating,
        })?;

        info!(id = ship.id, name = %ship.name, rating = ship.rating, "Created ship");
        Ok(ship)
    }

    pub fn update_ship(&self, id: u64, patch: &ShipPatch) -> CatalogResult<Ship> {
        let existing = self
        .store
        .get_by_id(check_id(id)?)?
        .ok_or(CatalogError::NotFound(id))?;

        if patch.is_empty() {
            debug!(id, "Empty patch, nothing to write");
            return Ok(existing);
        }

        let updated = merge(&existing, patch)?;
        let saved = self.store.save(updated)?;

        info!(id, rating = saved.rating, "Updated ship");
        Ok(saved)
    }

    pub fn delete_ship(&self, id: u64) -> CatalogResult<()> {
        let existing = self
        .store
        .get_by_id(check_id(id)?)?
        .ok_or(CatalogError::NotFound(id))?;

        self.store.delete(&existing)?;
        info!(id, "Deleted ship");
        Ok(())
    }
}
