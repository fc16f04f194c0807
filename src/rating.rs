use crate::error::{CatalogError, CatalogResult};
use crate::model::production_year;

/// The catalog's "current" year. Ratings fall off with distance from it.
pub const CURRENT_YEAR: i32 = 3019;

/// rating = 80 * speed * k / (3019 - year + 1), with k = 0.5 for used ships,
/// rounded half-up to two decimals.
pub fn compute_rating(speed: f64, is_used: bool, prod_date: i64) -> CatalogResult<f64> {
    let year = production_year(prod_date).ok_or(CatalogError::InvalidTimestamp(prod_date))?;

    let age = i64::from(CURRENT_YEAR) - i64::from(year) + 1;
    if age == 0 {
        return Err(CatalogError::RatingUndefined { year });
    }

    let coefficient = if is_used { 0.5 } else { 1.0 };
    let raw = (80.0 * speed * coefficient) / age as f64;
    Ok(round_to_cents(raw))
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}
