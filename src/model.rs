use chrono::{DateTime, Datelike};
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Id carried by a ship that has never been saved. Store-assigned ids start at 1.
pub const UNASSIGNED_ID: u64 = 0;

#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[archive(check_bytes)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShipType {
    Transport,
    Military,
    Merchant,
}

impl ShipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipType::Transport => "TRANSPORT",
            ShipType::Military => "MILITARY",
            ShipType::Merchant => "MERCHANT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TRANSPORT" => Some(ShipType::Transport),
            "MILITARY" => Some(ShipType::Military),
            "MERCHANT" => Some(ShipType::Merchant),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry. Persisted ships always satisfy the validator and carry a rating
/// derived from `speed`, `is_used` and `prod_date`.
#[derive(Archive, RkyvDeserialize, RkyvSerialize, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[archive(check_bytes)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    pub id: u64,
    pub name: String,
    pub planet: String,
    pub ship_type: ShipType,

    /// Milliseconds since the Unix epoch (UTC)
    pub prod_date: i64,

    pub is_used: bool,
    pub speed: f64,
    pub crew_size: i32,
    pub rating: f64,
}

impl Ship {
    pub fn production_year(&self) -> Option<i32> {
        production_year(self.prod_date)
    }
}

/// Fields a client supplies to create a ship. Everything is optional at the
/// boundary; the validator decides what is actually required.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipDraft {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub prod_date: Option<i64>,
    pub is_used: Option<bool>,
    pub speed: Option<f64>,
    pub crew_size: Option<i32>,
}

/// A partial update. Absent fields leave the stored value untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ShipPatch {
    pub name: Option<String>,
    pub planet: Option<String>,
    pub ship_type: Option<ShipType>,
    pub prod_date: Option<i64>,
    pub is_used: Option<bool>,
    pub speed: Option<f64>,
    pub crew_size: Option<i32>,
}

impl ShipPatch {
    pub fn is_empty(&self) -> bool {
        *self == ShipPatch::default()
    }
}

impl From<ShipPatch> for ShipDraft {
    fn from(p: ShipPatch) -> Self {
        Self {
            name: p.name,
            planet: p.planet,
            ship_type: p.ship_type,
            prod_date: p.prod_date,
            is_used: p.is_used,
            speed: p.speed,
            crew_size: p.crew_size,
        }
    }
}

/// Calendar year (UTC) of a millisecond timestamp, if chrono can represent it.
pub fn production_year(millis: i64) -> Option<i32> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.year())
}
