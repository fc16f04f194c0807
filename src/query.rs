//! Filter, sort and page over a snapshot of the catalog.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::model::{Ship, ShipType};

pub const DEFAULT_PAGE_NUMBER: usize = 0;
pub const DEFAULT_PAGE_SIZE: usize = 3;

/// Independent, all-optional filter constraints. A ship matches when it
/// satisfies every constraint that is present.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipCriteria {
    /// Case-sensitive substring of the name
    pub name: Option<String>,
    /// Case-sensitive substring of the planet
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    /// Exclusive lower bound on `prod_date` (ms)
    pub after: Option<i64>,
    /// Exclusive upper bound on `prod_date` (ms)
    pub before: Option<i64>,
    pub is_used: Option<bool>,
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub min_crew_size: Option<i32>,
    pub max_crew_size: Option<i32>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
}

impl ShipCriteria {
    pub fn matches(&self, ship: &Ship) -> bool {
        fn check<T>(bound: &Option<T>, pred: impl FnOnce(&T) -> bool) -> bool {
            bound.as_ref().map_or(true, pred)
        }

        check(&self.name, |s| ship.name.contains(s.as_str()))
            && check(&self.planet, |s| ship.planet.contains(s.as_str()))
            && check(&self.ship_type, |t| ship.ship_type == *t)
            && check(&self.after, |t| ship.prod_date > *t)
            && check(&self.before, |t| ship.prod_date < *t)
            && check(&self.is_used, |u| ship.is_used == *u)
            && check(&self.min_speed, |v| ship.speed >= *v)
            && check(&self.max_speed, |v| ship.speed <= *v)
            && check(&self.min_crew_size, |n| ship.crew_size >= *n)
            && check(&self.max_crew_size, |n| ship.crew_size <= *n)
            && check(&self.min_rating, |r| ship.rating >= *r)
            && check(&self.max_rating, |r| ship.rating <= *r)
    }

    pub fn is_unconstrained(&self) -> bool {
        *self == ShipCriteria::default()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShipOrder {
    Id,
    Speed,
    Date,
    Rating,
    #[default]
    Unspecified,
}

/// Totally ordered sort key. A single sort only ever compares keys of one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Id(u64),
    Float(OrderedFloat<f64>),
    Timestamp(i64),
}

type KeyFn = fn(&Ship) -> SortKey;

impl ShipOrder {
    /// Key extractor for this order, `None` when input order is kept.
    pub fn key_fn(self) -> Option<KeyFn> {
        let key: KeyFn = match self {
            ShipOrder::Id => |s| SortKey::Id(s.id),
            ShipOrder::Speed => |s| SortKey::Float(OrderedFloat(s.speed)),
            ShipOrder::Date => |s| SortKey::Timestamp(s.prod_date),
            ShipOrder::Rating => |s| SortKey::Float(OrderedFloat(s.rating)),
            ShipOrder::Unspecified => return None,
        };
        Some(key)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ID" => Some(ShipOrder::Id),
            "SPEED" => Some(ShipOrder::Speed),
            "DATE" | "PRODDATE" => Some(ShipOrder::Date),
            "RATING" => Some(ShipOrder::Rating),
            _ => None,
        }
    }
}

/// Ships matching `criteria`, in input order.
pub fn filter(ships: Vec<Ship>, criteria: &ShipCriteria) -> Vec<Ship> {
    ships.into_iter().filter(|s| criteria.matches(s)).collect()
}

pub fn count(ships: &[Ship], criteria: &ShipCriteria) -> usize {
    ships.iter().filter(|s| criteria.matches(s)).count()
}

/// Stable ascending sort on the order's key.
pub fn sort(mut ships: Vec<Ship>, order: ShipOrder) -> Vec<Ship> {
    if let Some(key) = order.key_fn() {
        ships.sort_by_key(key);
    }
    ships
}

/// Slice `[n * size, min(n * size + size, len))`. A page past the end is empty.
pub fn page(ships: Vec<Ship>, page_number: Option<usize>, page_size: Option<usize>) -> Vec<Ship> {
    let number = page_number.unwrap_or(DEFAULT_PAGE_NUMBER);
    let size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

    let from = number.saturating_mul(size);
    if from >= ships.len() {
        return Vec::new();
    }
    let to = from.saturating_add(size).min(ships.len());

    ships.into_iter().skip(from).take(to - from).collect()
}
