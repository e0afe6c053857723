use chrono::{DateTime, Datelike, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Sales status of a car in the showroom.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    #[default]
    Available,
    Reserved,
    Sold,
}

impl CarStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CarStatus::Available => "Available",
            CarStatus::Reserved => "Reserved",
            CarStatus::Sold => "Sold",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
    Gas,
}

impl FuelType {
    pub const ALL: [FuelType; 5] = [
        FuelType::Petrol,
        FuelType::Diesel,
        FuelType::Electric,
        FuelType::Hybrid,
        FuelType::Gas,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Petrol => "Petrol",
            FuelType::Diesel => "Diesel",
            FuelType::Electric => "Electric",
            FuelType::Hybrid => "Hybrid",
            FuelType::Gas => "Gas",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transmission {
    Automatic,
    Manual,
    Robotic,
    Cvt,
}

impl Transmission {
    pub const ALL: [Transmission; 4] = [
        Transmission::Automatic,
        Transmission::Manual,
        Transmission::Robotic,
        Transmission::Cvt,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Transmission::Automatic => "Automatic",
            Transmission::Manual => "Manual",
            Transmission::Robotic => "Robotic",
            Transmission::Cvt => "CVT",
        }
    }
}

/// A car listed in the catalog.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    /// Price in whole tenge.
    pub price: i64,
    #[serde(default)]
    pub mileage: i64,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub status: CarStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Admin-supplied fields for creating or replacing a car.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarInput {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: i64,
    #[serde(default)]
    pub mileage: i64,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CarStatus>,
}

impl CarInput {
    /// Checks the fields an admin form can get wrong. Returns the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.brand.trim().is_empty() {
            return Err("Brand is required".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("Model is required".to_string());
        }
        let newest = Utc::now().year() + 1;
        if self.year < 1900 || self.year > newest {
            return Err(format!("Year must be between 1900 and {}", newest));
        }
        if self.price < 0 {
            return Err("Price must not be negative".to_string());
        }
        if self.mileage < 0 {
            return Err("Mileage must not be negative".to_string());
        }
        Ok(())
    }
}

impl Car {
    /// Build a new catalog entry from admin input.
    pub fn from_input(input: CarInput) -> Self {
        let now = Utc::now();
        Car {
            id: ObjectId::new().to_hex(),
            brand: input.brand.trim().to_string(),
            model: input.model.trim().to_string(),
            year: input.year,
            price: input.price,
            mileage: input.mileage,
            fuel_type: input.fuel_type,
            transmission: input.transmission,
            color: input.color,
            engine_volume: input.engine_volume,
            location: input.location,
            vin: input.vin,
            description: input.description,
            features: input.features,
            images: Vec::new(),
            status: input.status.unwrap_or_default(),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    /// Overwrite the editable fields, keeping id, images and creation time.
    pub fn apply(&mut self, input: CarInput) {
        self.brand = input.brand.trim().to_string();
        self.model = input.model.trim().to_string();
        self.year = input.year;
        self.price = input.price;
        self.mileage = input.mileage;
        self.fuel_type = input.fuel_type;
        self.transmission = input.transmission;
        self.color = input.color;
        self.engine_volume = input.engine_volume;
        self.location = input.location;
        self.vin = input.vin;
        self.description = input.description;
        self.features = input.features;
        if let Some(status) = input.status {
            self.status = status;
        }
        self.updated_at = Some(Utc::now());
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}

/// Catalog search parameters, as sent in the `GET /api/cars` query string.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CarQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_from: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_to: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<FuelType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Transmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CarStatus>,
}

impl CarQuery {
    pub fn is_empty(&self) -> bool {
        self == &CarQuery::default()
    }

    /// In-process evaluation of the query. Brand matches exactly and model as a
    /// substring, both ignoring case; ranges are inclusive.
    pub fn matches(&self, car: &Car) -> bool {
        if let Some(brand) = &self.brand {
            if car.brand.to_lowercase() != brand.trim().to_lowercase() {
                return false;
            }
        }
        if let Some(model) = &self.model {
            let needle = model.trim().to_lowercase();
            if !car.model.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if self.year_from.is_some_and(|from| car.year < from) {
            return false;
        }
        if self.year_to.is_some_and(|to| car.year > to) {
            return false;
        }
        if self.price_min.is_some_and(|min| car.price < min) {
            return false;
        }
        if self.price_max.is_some_and(|max| car.price > max) {
            return false;
        }
        if self.fuel_type.is_some_and(|fuel| car.fuel_type != fuel) {
            return false;
        }
        if self
            .transmission
            .is_some_and(|transmission| car.transmission != transmission)
        {
            return false;
        }
        if self.status.is_some_and(|status| car.status != status) {
            return false;
        }
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_input(brand: &str, model: &str, year: i32, price: i64) -> CarInput {
        CarInput {
            brand: brand.to_string(),
            model: model.to_string(),
            year,
            price,
            mileage: 12_000,
            fuel_type: FuelType::Petrol,
            transmission: Transmission::Automatic,
            color: Some("White".to_string()),
            engine_volume: Some(2.5),
            location: Some("Almaty".to_string()),
            vin: None,
            description: None,
            features: vec!["Heated seats".to_string()],
            status: None,
        }
    }

    #[test]
    fn test_query_matches_brand_case_insensitively() {
        let car = Car::from_input(sample_input("Toyota", "Camry", 2020, 500_000));
        let query = CarQuery {
            brand: Some("toyota".into()),
            ..Default::default()
        };
        assert!(query.matches(&car));

        let other = CarQuery {
            brand: Some("Toyo".into()),
            ..Default::default()
        };
        assert!(!other.matches(&car));

        let lada = Car::from_input(sample_input("Лада", "Веста", 2022, 400_000));
        let cyrillic = CarQuery {
            brand: Some(" лада ".into()),
            model: Some("ВЕСТ".into()),
            ..Default::default()
        };
        assert!(cyrillic.matches(&lada));
    }

    #[test]
    fn test_query_matches_model_substring_and_ranges() {
        let car = Car::from_input(sample_input("Toyota", "Land Cruiser", 2018, 900_000));
        let query = CarQuery {
            model: Some("cruiser".into()),
            year_from: Some(2018),
            year_to: Some(2018),
            price_min: Some(900_000),
            price_max: Some(900_000),
            ..Default::default()
        };
        assert!(query.matches(&car));

        let too_new = CarQuery {
            year_from: Some(2019),
            ..Default::default()
        };
        assert!(!too_new.matches(&car));
    }

    #[test]
    fn test_query_filters_by_enums() {
        let car = Car::from_input(sample_input("Kia", "Rio", 2021, 300_000));
        let diesel = CarQuery {
            fuel_type: Some(FuelType::Diesel),
            ..Default::default()
        };
        assert!(!diesel.matches(&car));
        let available = CarQuery {
            status: Some(CarStatus::Available),
            transmission: Some(Transmission::Automatic),
            ..Default::default()
        };
        assert!(available.matches(&car));
    }

    #[test]
    fn test_apply_keeps_identity_and_images() {
        let mut car = Car::from_input(sample_input("Kia", "Rio", 2021, 300_000));
        car.images.push("/uploads/cars/a.png".into());
        let id = car.id.clone();
        let mut input = sample_input("Kia", "Rio X", 2022, 350_000);
        input.status = Some(CarStatus::Sold);
        car.apply(input);
        assert_eq!(car.id, id);
        assert_eq!(car.model, "Rio X");
        assert_eq!(car.images.len(), 1);
        assert_eq!(car.status, CarStatus::Sold);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(sample_input("", "Rio", 2021, 1).validate().is_err());
        assert!(sample_input("Kia", "Rio", 1800, 1).validate().is_err());
        assert!(sample_input("Kia", "Rio", 2021, -1).validate().is_err());
        assert!(sample_input("Kia", "Rio", 2021, 1).validate().is_ok());
    }

    #[test]
    fn test_query_serializes_only_set_fields() {
        let query = CarQuery {
            year_from: Some(2015),
            fuel_type: Some(FuelType::Hybrid),
            ..Default::default()
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, serde_json::json!({"yearFrom": 2015, "fuelType": "hybrid"}));
    }
}
