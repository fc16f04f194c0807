//! Field-level legality checks. Every check is a pure predicate.
//!
//! The production-date window is the whole-year span 2800..=3018 (UTC). Boundary
//! instants do not drift with the date the check runs on.

use crate::model::{production_year, Ship, ShipDraft};

pub const MAX_STRING_LEN: usize = 50;

pub const MIN_PROD_YEAR: i32 = 2800;
pub const MAX_PROD_YEAR: i32 = 3018;

pub const MIN_SPEED: f64 = 0.01;
pub const MAX_SPEED: f64 = 0.99;

pub const MIN_CREW_SIZE: i32 = 1;
pub const MAX_CREW_SIZE: i32 = 9999;

/// Non-empty and at most 50 UTF-16 code units, so characters outside the
/// basic multilingual plane count twice.
pub fn is_string_valid(value: &str) -> bool {
    !value.is_empty() && value.encode_utf16().count() <= MAX_STRING_LEN
}

pub fn is_prod_date_valid(millis: i64) -> bool {
    production_year(millis).is_some_and(|year| (MIN_PROD_YEAR..=MAX_PROD_YEAR).contains(&year))
}

pub fn is_speed_valid(speed: f64) -> bool {
    (MIN_SPEED..=MAX_SPEED).contains(&speed)
}

pub fn is_crew_size_valid(crew_size: i32) -> bool {
    (MIN_CREW_SIZE..=MAX_CREW_SIZE).contains(&crew_size)
}

/// Name of the first field of `draft` that is missing or illegal.
pub fn first_invalid_field(draft: &ShipDraft) -> Option<&'static str> {
    if !draft.name.as_deref().is_some_and(is_string_valid) {
        return Some("name");
    }
    if !draft.planet.as_deref().is_some_and(is_string_valid) {
        return Some("planet");
    }
    if draft.ship_type.is_none() {
        return Some("shipType");
    }
    if !draft.prod_date.is_some_and(is_prod_date_valid) {
        return Some("prodDate");
    }
    if !draft.speed.is_some_and(is_speed_valid) {
        return Some("speed");
    }
    if !draft.crew_size.is_some_and(is_crew_size_valid) {
        return Some("crewSize");
    }
    None
}

pub fn is_draft_valid(draft: &ShipDraft) -> bool {
    first_invalid_field(draft).is_none()
}

/// Validity of an already-built ship. The rating is not checked here.
pub fn is_ship_valid(ship: &Ship) -> bool {
    is_string_valid(&ship.name)
        && is_string_valid(&ship.planet)
        && is_prod_date_valid(ship.prod_date)
        && is_speed_valid(ship.speed)
        && is_crew_size_valid(ship.crew_size)
}
