//! Catalog filter form state.

use chrono::{Datelike, Utc};

use crate::models::{CarQuery, FuelType, Transmission};

pub const PRICE_MIN: i64 = 0;
pub const PRICE_MAX: i64 = 1_000_000;
pub const PRICE_STEP: i64 = 10_000;
pub const YEAR_MIN: i32 = 1990;

/// The filter panel above the car listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarFilter {
    pub brand: String,
    pub model: String,
    year_from: Option<i32>,
    year_to: Option<i32>,
    price_range: (i64, i64),
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
}

impl Default for CarFilter {
    fn default() -> Self {
        CarFilter {
            brand: String::new(),
            model: String::new(),
            year_from: None,
            year_to: None,
            price_range: (PRICE_MIN, PRICE_MAX),
            fuel_type: None,
            transmission: None,
        }
    }
}

/// Newest model year the year inputs accept.
pub fn year_max() -> i32 {
    Utc::now().year()
}

fn clamp_year(year: Option<i32>) -> Option<i32> {
    year.map(|y| y.clamp(YEAR_MIN, year_max()))
}

fn snap_price(price: i64) -> i64 {
    let clamped = price.clamp(PRICE_MIN, PRICE_MAX);
    (clamped + PRICE_STEP / 2) / PRICE_STEP * PRICE_STEP
}

impl CarFilter {
    pub fn year_from(&self) -> Option<i32> {
        self.year_from
    }

    pub fn year_to(&self) -> Option<i32> {
        self.year_to
    }

    pub fn price_range(&self) -> (i64, i64) {
        self.price_range
    }

    /// Out-of-range years are pulled back into the accepted range.
    pub fn set_year_from(&mut self, year: Option<i32>) {
        self.year_from = clamp_year(year);
    }

    pub fn set_year_to(&mut self, year: Option<i32>) {
        self.year_to = clamp_year(year);
    }

    /// Both ends snap to the slider step; a reversed range is swapped.
    pub fn set_price_range(&mut self, low: i64, high: i64) {
        let (low, high) = (snap_price(low), snap_price(high));
        self.price_range = if low <= high { (low, high) } else { (high, low) };
    }

    /// The query to send: blank fields and the untouched price range are left out.
    pub fn submit(&self) -> CarQuery {
        let text = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        let (price_min, price_max) = if self.price_range == (PRICE_MIN, PRICE_MAX) {
            (None, None)
        } else {
            (Some(self.price_range.0), Some(self.price_range.1))
        };
        CarQuery {
            brand: text(&self.brand),
            model: text(&self.model),
            year_from: self.year_from,
            year_to: self.year_to,
            price_min,
            price_max,
            fuel_type: self.fuel_type,
            transmission: self.transmission,
            status: None,
        }
    }

    /// Back to defaults. Returns the (empty) query for the reset listing.
    pub fn reset(&mut self) -> CarQuery {
        *self = CarFilter::default();
        self.submit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_filter_is_empty_query() {
        assert!(CarFilter::default().submit().is_empty());
    }

    #[test]
    fn test_blank_fields_omitted() {
        let mut filter = CarFilter {
            brand: "  ".into(),
            model: " Camry ".into(),
            ..Default::default()
        };
        filter.fuel_type = Some(FuelType::Hybrid);
        let query = filter.submit();
        assert_eq!(query.brand, None);
        assert_eq!(query.model.as_deref(), Some("Camry"));
        assert_eq!(query.fuel_type, Some(FuelType::Hybrid));
        assert_eq!(query.price_min, None);
        assert_eq!(query.price_max, None);
    }

    #[test]
    fn test_price_range_sent_when_changed() {
        let mut filter = CarFilter::default();
        filter.set_price_range(104_000, 496_000);
        assert_eq!(filter.price_range(), (100_000, 500_000));
        let query = filter.submit();
        assert_eq!(query.price_min, Some(100_000));
        assert_eq!(query.price_max, Some(500_000));

        filter.set_price_range(2_000_000, -5);
        assert_eq!(filter.price_range(), (PRICE_MIN, PRICE_MAX));
        assert_eq!(filter.submit().price_max, None);
    }

    #[test]
    fn test_years_clamped() {
        let mut filter = CarFilter::default();
        filter.set_year_from(Some(1950));
        filter.set_year_to(Some(3000));
        assert_eq!(filter.year_from(), Some(YEAR_MIN));
        assert_eq!(filter.year_to(), Some(year_max()));
    }

    #[test]
    fn test_reset() {
        let mut filter = CarFilter {
            brand: "BMW".into(),
            transmission: Some(Transmission::Manual),
            ..Default::default()
        };
        filter.set_year_from(Some(2010));
        assert!(filter.reset().is_empty());
        assert_eq!(filter, CarFilter::default());
    }
}
