//! Catalog Service Tests
//!
//! End-to-end behaviour of the list/count/get/create/update/delete contract
//! over the in-memory store:
//! - Rating is derived on create and on rating-relevant updates
//! - Validation failures never touch the store
//! - NotFound and InvalidIdentifier stay distinct

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use shipyard::error::CatalogError;
use shipyard::store::ShipStore;
use shipyard::{MemoryStore, ShipCriteria, ShipDraft, ShipOrder, ShipPatch, ShipService, ShipType};

// =============================================================================
// Helper Functions
// =============================================================================

fn year_start(year: i32) -> i64 {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap().timestamp_millis()
}

fn draft(name: &str, speed: f64, year: i32) -> ShipDraft {
    ShipDraft {
        name: Some(name.to_string()),
        planet: Some("Earth".to_string()),
        ship_type: Some(ShipType::Transport),
        prod_date: Some(year_start(year)),
        is_used: None,
        speed: Some(speed),
        crew_size: Some(10),
    }
}

fn service() -> ShipService<MemoryStore> {
    ShipService::new(Arc::new(MemoryStore::new()))
}

fn seeded() -> ShipService<MemoryStore> {
    let svc = service();
    for (name, speed, year) in [
        ("Alpha", 0.10, 3000),
        ("Bravo", 0.40, 3005),
        ("Charlie", 0.50, 3010),
        ("Delta", 0.90, 2990),
        ("Echo", 0.40, 3015),
        ("Foxtrot", 0.20, 2900),
        ("Golf", 0.70, 3018),
    ] {
        svc.create_ship(draft(name, speed, year)).unwrap();
    }
    svc
}

// =============================================================================
// Create
// =============================================================================

#[test]
fn test_create_assigns_id_and_rating() {
    let svc = service();
    let ship = svc.create_ship(draft("Voyager", 0.5, 3010)).unwrap();

    assert_eq!(ship.id, 1);
    assert!(!ship.is_used);
    assert_eq!(ship.rating, 4.0);
    assert_eq!(svc.get_ship(1).unwrap(), Some(ship));
}

#[test]
fn test_create_used_ship() {
    let svc = service();
    let mut d = draft("Relic", 0.5, 3010);
    d.is_used = Some(true);
    assert_eq!(svc.create_ship(d).unwrap().rating, 2.0);
}

#[test]
fn test_crew_size_lower_bound_on_create() {
    let svc = service();

    let mut d = draft("Empty", 0.5, 3010);
    d.crew_size = Some(0);
    assert!(matches!(
        svc.create_ship(d),
        Err(CatalogError::InvalidRecord { field: "crewSize" })
    ));

    let mut d = draft("Solo", 0.5, 3010);
    d.crew_size = Some(1);
    assert!(svc.create_ship(d).is_ok());
}

#[test]
fn test_invalid_create_stores_nothing() {
    let svc = service();
    let mut d = draft("Too fast", 1.5, 3010);
    d.is_used = Some(true);
    assert!(svc.create_ship(d).is_err());
    assert_eq!(svc.count_ships(&ShipCriteria::default()).unwrap(), 0);
}

#[test]
fn test_create_rejects_date_outside_window() {
    let svc = service();
    assert!(svc.create_ship(draft("Future", 0.5, 3019)).is_err());
    assert!(svc.create_ship(draft("Ancient", 0.5, 2799)).is_err());
    assert!(svc.create_ship(draft("Oldest", 0.5, 2800)).is_ok());
}

// =============================================================================
// List / Count
// =============================================================================

#[test]
fn test_list_defaults_to_first_three_in_store_order() {
    let svc = seeded();
    let page = svc
    .list_ships(&ShipCriteria::default(), ShipOrder::Unspecified, None, None)
    .unwrap();
    let names: Vec<_> = page.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Bravo", "Charlie"]);
}

#[test]
fn test_list_filters_sorts_and_pages() {
    let svc = seeded();
    let criteria = ShipCriteria {
        min_speed: Some(0.3),
        max_speed: Some(0.8),
        ..Default::default()
    };

    let first = svc.list_ships(&criteria, ShipOrder::Speed, Some(0), Some(2)).unwrap();
    let second = svc.list_ships(&criteria, ShipOrder::Speed, Some(1), Some(2)).unwrap();
    let third = svc.list_ships(&criteria, ShipOrder::Speed, Some(2), Some(2)).unwrap();

    let names = |v: &[shipyard::model::Ship]| v.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
    // Bravo and Echo tie on speed and keep store order.
    assert_eq!(names(&first), vec!["Bravo", "Echo"]);
    assert_eq!(names(&second), vec!["Charlie", "Golf"]);
    assert!(third.is_empty());
    assert_eq!(svc.count_ships(&criteria).unwrap(), 4);
}

#[test]
fn test_count_ignores_paging() {
    let svc = seeded();
    assert_eq!(svc.count_ships(&ShipCriteria::default()).unwrap(), 7);

    let used = ShipCriteria { is_used: Some(true), ..Default::default() };
    assert_eq!(svc.count_ships(&used).unwrap(), 0);
}

#[test]
fn test_list_by_rating_is_ascending() {
    let svc = seeded();
    let ships = svc
    .list_ships(&ShipCriteria::default(), ShipOrder::Rating, Some(0), Some(100))
    .unwrap();
    assert_eq!(ships.len(), 7);
    assert!(ships.windows(2).all(|w| w[0].rating <= w[1].rating));
}

// =============================================================================
// Update
// =============================================================================

#[test]
fn test_update_recomputes_rating() {
    let svc = seeded();
    let patch = ShipPatch { speed: Some(0.9), ..Default::default() };
    let updated = svc.update_ship(3, &patch).unwrap();

    // 80 * 0.9 / 10
    assert_eq!(updated.rating, 7.2);
    assert_eq!(svc.get_ship(3).unwrap().unwrap().rating, 7.2);
}

#[test]
fn test_update_is_atomic() {
    let svc = seeded();
    let before = svc.get_ship(2).unwrap().unwrap();

    let patch = ShipPatch {
        name: Some("Renamed".into()),
        speed: Some(0.3),
        planet: Some("x".repeat(51)),
        ..Default::default()
    };
    assert!(matches!(
        svc.update_ship(2, &patch),
        Err(CatalogError::InvalidPatch { field: "planet" })
    ));
    assert_eq!(svc.get_ship(2).unwrap().unwrap(), before);
}

#[test]
fn test_empty_patch_leaves_ship_unchanged() {
    let svc = seeded();
    let before = svc.get_ship(5).unwrap().unwrap();
    assert_eq!(svc.update_ship(5, &ShipPatch::default()).unwrap(), before);
    assert_eq!(svc.get_ship(5).unwrap().unwrap(), before);
}

#[test]
fn test_update_missing_ship() {
    let svc = seeded();
    let patch = ShipPatch { name: Some("Ghost".into()), ..Default::default() };
    assert!(matches!(svc.update_ship(99, &patch), Err(CatalogError::NotFound(99))));
}

#[test]
fn test_zero_id_is_invalid_identifier() {
    let svc = seeded();
    assert!(matches!(svc.get_ship(0), Err(CatalogError::InvalidIdentifier(_))));
    assert!(matches!(svc.delete_ship(0), Err(CatalogError::InvalidIdentifier(_))));
    assert!(matches!(
        svc.update_ship(0, &ShipPatch::default()),
        Err(CatalogError::InvalidIdentifier(_))
    ));
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_then_operations_fail() {
    let svc = seeded();
    svc.delete_ship(4).unwrap();

    assert_eq!(svc.get_ship(4).unwrap(), None);
    assert!(matches!(svc.delete_ship(4), Err(CatalogError::NotFound(4))));
    assert!(matches!(
        svc.update_ship(4, &ShipPatch::default()),
        Err(CatalogError::NotFound(4))
    ));
    assert_eq!(svc.count_ships(&ShipCriteria::default()).unwrap(), 6);
}

#[test]
fn test_deleted_ids_are_not_reused() {
    let svc = seeded();
    svc.delete_ship(7).unwrap();
    let ship = svc.create_ship(draft("Hotel", 0.3, 3000)).unwrap();
    assert_eq!(ship.id, 8);
    assert_eq!(svc.store().list().unwrap().len(), 7);
}
