//! Partial update of a stored ship.

use crate::error::{CatalogError, CatalogResult};
use crate::model::{Ship, ShipPatch};
use crate::rating::compute_rating;
use crate::validator::{is_crew_size_valid, is_prod_date_valid, is_speed_valid, is_string_valid};

/// Applies every present field of `patch` to a copy of `existing`.
///
/// All-or-nothing: the first illegal field yields `InvalidPatch` and no copy
/// escapes. `existing` is never touched. The rating is recomputed from the
/// final values only when `prod_date`, `is_used` or `speed` was supplied.
pub fn merge(existing: &Ship, patch: &ShipPatch) -> CatalogResult<Ship> {
    let mut ship = existing.clone();
    let mut rerate = false;

    if let Some(name) = &patch.name {
        if !is_string_valid(name) {
            return Err(CatalogError::InvalidPatch { field: "name" });
        }
        ship.name = name.clone();
    }

    if let Some(planet) = &patch.planet {
        if !is_string_valid(planet) {
            return Err(CatalogError::InvalidPatch { field: "planet" });
        }
        ship.planet = planet.clone();
    }

    if let Some(ship_type) = patch.ship_type {
        ship.ship_type = ship_type;
    }

    if let Some(prod_date) = patch.prod_date {
        if !is_prod_date_valid(prod_date) {
            return Err(CatalogError::InvalidPatch { field: "prodDate" });
        }
        ship.prod_date = prod_date;
        rerate = true;
    }

    if let Some(is_used) = patch.is_used {
        ship.is_used = is_used;
        rerate = true;
    }

    if let Some(speed) = patch.speed {
        if !is_speed_valid(speed) {
            return Err(CatalogError::InvalidPatch { field: "speed" });
        }
        ship.speed = speed;
        rerate = true;
    }

    if let Some(crew_size) = patch.crew_size {
        if !is_crew_size_valid(crew_size) {
            return Err(CatalogError::InvalidPatch { field: "crewSize" });
        }
        ship.crew_size = crew_size;
    }

    if rerate {
        ship.rating = compute_rating(ship.speed, ship.is_used, ship.prod_date)?;
    }

    Ok(ship)
}
