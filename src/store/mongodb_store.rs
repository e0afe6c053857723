use async_trait::async_trait;
use chrono::Utc;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, to_bson, Bson, Document, Regex};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument,
};
use mongodb::{Client, Collection, Database, IndexModel};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::base::{Store, StoreError, UserRecord};
use crate::models::{Car, CarInput, CarQuery, CarStatus, Order, ProfileUpdate, User};

/// MongoDB's duplicate key error code.
const DUPLICATE_KEY: i32 = 11000;

/// Car fields an admin edit overwrites. Absent optional fields are unset.
const EDITABLE_CAR_FIELDS: [&str; 13] = [
    "brand",
    "model",
    "year",
    "price",
    "mileage",
    "fuelType",
    "transmission",
    "color",
    "engineVolume",
    "location",
    "vin",
    "description",
    "features",
];

/// The config struct for MongoDB connections.
/// Contains the URI and database name.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
pub struct MongoDBConfig {
    pub uri: String,
    pub database: String,
}

/// A concrete `Store` implementation that uses MongoDB.
///
/// Each model is nested in a document that carries the lookup keys:
/// - `users`: the public user plus email, password hash and favorite ids
/// - `cars`: the car plus a numeric creation time for sorting
/// - `orders`: the order plus owner id and creation time
pub struct MongoDBStore {
    database: Database,
    user_collection: Collection<UserDocument>,
    car_collection: Collection<CarDocument>,
    order_collection: Collection<OrderDocument>,
}

/// Document shape for storing users in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct UserDocument {
    _id: String,
    email: String,
    password_hash: String,
    #[serde(default)]
    favorites: Vec<String>,
    user: User,
}

/// Document shape for storing cars in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct CarDocument {
    _id: String,
    created_ms: i64,
    car: Car,
}

/// Document shape for storing orders in MongoDB.
#[derive(Serialize, Deserialize, Clone, Debug)]
struct OrderDocument {
    _id: String,
    user_id: String,
    created_ms: i64,
    order: Order,
}

fn backend<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> StoreError + '_ {
    move |e| StoreError::Backend(format!("{}: {}", context, e))
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(we)) if we.code == DUPLICATE_KEY
    )
}

/// Escape regex metacharacters so user input matches literally.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn case_insensitive(pattern: String) -> Bson {
    Bson::RegularExpression(Regex {
        pattern,
        options: "i".to_string(),
    })
}

fn status_bson(status: CarStatus) -> Result<Bson, StoreError> {
    to_bson(&status).map_err(backend("Failed to encode car status"))
}

fn now_bson() -> Result<Bson, StoreError> {
    to_bson(&Utc::now()).map_err(backend("Failed to encode timestamp"))
}

/// The `$set`/`$unset` update for an admin edit of the nested `car` fields.
fn car_edit(input: &CarInput) -> Result<Document, StoreError> {
    let mut input = input.clone();
    input.brand = input.brand.trim().to_string();
    input.model = input.model.trim().to_string();
    let fields = match to_bson(&input).map_err(backend("Failed to encode car"))? {
        Bson::Document(fields) => fields,
        other => {
            return Err(StoreError::Backend(format!(
                "Car input encoded as {:?}, expected a document",
                other.element_type()
            )))
        }
    };

    let mut set = Document::new();
    let mut unset = Document::new();
    for field in EDITABLE_CAR_FIELDS {
        let path = format!("car.{}", field);
        match fields.get(field) {
            Some(value) => set.insert(path, value.clone()),
            None => unset.insert(path, ""),
        };
    }
    if let Some(status) = input.status {
        set.insert("car.status", status_bson(status)?);
    }
    set.insert("car.updatedAt", now_bson()?);

    let mut update = doc! { "$set": set };
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    Ok(update)
}

/// Translate a catalog query into a MongoDB filter on the nested `car` fields.
fn car_filter(query: &CarQuery) -> Result<Document, StoreError> {
    let mut filter = Document::new();
    if let Some(brand) = &query.brand {
        filter.insert(
            "car.brand",
            case_insensitive(format!("^{}$", escape_regex(brand.trim()))),
        );
    }
    if let Some(model) = &query.model {
        filter.insert("car.model", case_insensitive(escape_regex(model.trim())));
    }

    let mut year = Document::new();
    if let Some(from) = query.year_from {
        year.insert("$gte", from);
    }
    if let Some(to) = query.year_to {
        year.insert("$lte", to);
    }
    if !year.is_empty() {
        filter.insert("car.year", year);
    }

    let mut price = Document::new();
    if let Some(min) = query.price_min {
        price.insert("$gte", min);
    }
    if let Some(max) = query.price_max {
        price.insert("$lte", max);
    }
    if !price.is_empty() {
        filter.insert("car.price", price);
    }

    if let Some(fuel) = query.fuel_type {
        filter.insert(
            "car.fuelType",
            to_bson(&fuel).map_err(backend("Failed to encode fuel type"))?,
        );
    }
    if let Some(transmission) = query.transmission {
        filter.insert(
            "car.transmission",
            to_bson(&transmission).map_err(backend("Failed to encode transmission"))?,
        );
    }
    if let Some(status) = query.status {
        filter.insert("car.status", status_bson(status)?);
    }
    Ok(filter)
}

async fn create_index<T>(
    collection: &Collection<T>,
    keys: Document,
    unique: bool,
) -> Result<(), String> {
    let mut model = IndexModel::default();
    model.keys = keys.clone();
    if unique {
        model.options = Some(IndexOptions::builder().unique(true).build());
    }
    collection
        .create_index(model, None)
        .await
        .map_err(|e| format!("Failed to create index on {}: {}", keys, e))?;
    Ok(())
}

impl MongoDBStore {
    /// Creates a new `MongoDBStore` from the given config.
    /// It initializes client connections, sets up indexes, etc.
    pub async fn new(config: &MongoDBConfig) -> Result<Self, String> {
        info!("Connecting to MongoDB database '{}'", config.database);

        let mut client_options = ClientOptions::parse(&config.uri)
            .await
            .map_err(|e| format!("Failed to parse MongoDB URI: {}", e))?;
        client_options.app_name = Some("Autosalon".to_string());

        let client = Client::with_options(client_options)
            .map_err(|e| format!("Failed to create MongoDB client: {}", e))?;

        let database = client.database(&config.database);
        let user_collection = database.collection::<UserDocument>("users");
        let car_collection = database.collection::<CarDocument>("cars");
        let order_collection = database.collection::<OrderDocument>("orders");

        // Catalog lookups
        create_index(&car_collection, doc! { "car.brand": 1, "car.model": 1 }, false).await?;
        create_index(&car_collection, doc! { "car.price": 1 }, false).await?;
        create_index(&car_collection, doc! { "car.year": 1 }, false).await?;
        create_index(&car_collection, doc! { "car.status": 1 }, false).await?;
        create_index(&car_collection, doc! { "created_ms": -1 }, false).await?;

        // Order history
        create_index(&order_collection, doc! { "user_id": 1 }, false).await?;
        create_index(&order_collection, doc! { "order.status": 1 }, false).await?;
        create_index(&order_collection, doc! { "created_ms": -1 }, false).await?;

        // One account per email
        create_index(&user_collection, doc! { "email": 1 }, true).await?;

        info!("MongoDB connection established successfully.");

        Ok(Self {
            database,
            user_collection,
            car_collection,
            order_collection,
        })
    }

    fn user_to_doc(user: &User, password_hash: &str) -> UserDocument {
        UserDocument {
            _id: user.id.clone(),
            email: user.email.clone(),
            password_hash: password_hash.to_string(),
            favorites: Vec::new(),
            user: user.clone(),
        }
    }

    fn doc_to_record(doc: UserDocument) -> UserRecord {
        UserRecord {
            user: doc.user,
            password_hash: doc.password_hash,
        }
    }

    fn car_to_doc(car: &Car) -> CarDocument {
        let created_ms = car.created_at.unwrap_or_else(Utc::now).timestamp_millis();
        CarDocument {
            _id: car.id.clone(),
            created_ms,
            car: car.clone(),
        }
    }

    fn order_to_doc(order: &Order) -> OrderDocument {
        let created_ms = order.created_at.unwrap_or_else(Utc::now).timestamp_millis();
        OrderDocument {
            _id: order.id.clone(),
            user_id: order.user_id.clone(),
            created_ms,
            order: order.clone(),
        }
    }

    fn return_updated() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    fn newest_first() -> FindOptions {
        FindOptions::builder()
            .sort(doc! { "created_ms": -1 })
            .build()
    }

    async fn collect_cars(&self, filter: Document) -> Result<Vec<Car>, StoreError> {
        let mut cursor = self
            .car_collection
            .find(filter, Self::newest_first())
            .await
            .map_err(backend("Failed to query cars"))?;
        let mut cars = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(backend("Failed to read car document"))?
        {
            cars.push(doc.car);
        }
        Ok(cars)
    }
}

#[async_trait]
impl Store for MongoDBStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<(), StoreError> {
        match self
            .user_collection
            .insert_one(Self::user_to_doc(user, password_hash), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                debug!("Duplicate email on registration.");
                Err(StoreError::Conflict("User already exists".to_string()))
            }
            Err(e) => Err(backend("Failed to insert user")(e)),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .user_collection
            .find_one(doc! { "email": email }, None)
            .await
            .map_err(backend("Failed to query user by email"))?
            .map(Self::doc_to_record))
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .user_collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend("Failed to query user"))?
            .map(|doc| doc.user))
    }

    async fn update_user(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut set = Document::new();
        if let Some(name) = &update.name {
            set.insert("user.name", name.as_str());
        }
        if let Some(phone) = &update.phone {
            set.insert("user.phone", phone.as_str());
        }
        if set.is_empty() {
            return self.get_user(id).await?.ok_or(StoreError::NotFound("User"));
        }
        self.user_collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, Self::return_updated())
            .await
            .map_err(backend("Failed to update user"))?
            .map(|doc| doc.user)
            .ok_or(StoreError::NotFound("User"))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let options = FindOptions::builder().sort(doc! { "email": 1 }).build();
        let mut cursor = self
            .user_collection
            .find(None, options)
            .await
            .map_err(backend("Failed to list users"))?;
        let mut users = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(backend("Failed to read user document"))?
        {
            users.push(doc.user);
        }
        Ok(users)
    }

    async fn favorite_ids(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.user_collection
            .find_one(doc! { "_id": user_id }, None)
            .await
            .map_err(backend("Failed to query favorites"))?
            .map(|doc| doc.favorites)
            .ok_or(StoreError::NotFound("User"))
    }

    async fn add_favorite(&self, user_id: &str, car_id: &str) -> Result<(), StoreError> {
        let result = self
            .user_collection
            .update_one(
                doc! { "_id": user_id },
                doc! { "$addToSet": { "favorites": car_id } },
                None,
            )
            .await
            .map_err(backend("Failed to add favorite"))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, car_id: &str) -> Result<(), StoreError> {
        let result = self
            .user_collection
            .update_one(
                doc! { "_id": user_id },
                doc! { "$pull": { "favorites": car_id } },
                None,
            )
            .await
            .map_err(backend("Failed to remove favorite"))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    async fn list_cars(&self, query: &CarQuery) -> Result<Vec<Car>, StoreError> {
        self.collect_cars(car_filter(query)?).await
    }

    async fn get_car(&self, id: &str) -> Result<Option<Car>, StoreError> {
        Ok(self
            .car_collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend("Failed to query car"))?
            .map(|doc| doc.car))
    }

    async fn get_cars(&self, ids: &[String]) -> Result<Vec<Car>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let found = self
            .collect_cars(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|car| &car.id == id).cloned())
            .collect())
    }

    async fn insert_car(&self, car: &Car) -> Result<(), StoreError> {
        match self
            .car_collection
            .insert_one(Self::car_to_doc(car), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(StoreError::Conflict(format!("Car {} already exists", car.id)))
            }
            Err(e) => Err(backend("Failed to insert car")(e)),
        }
    }

    async fn update_car(&self, id: &str, input: &CarInput) -> Result<Option<Car>, StoreError> {
        Ok(self
            .car_collection
            .find_one_and_update(doc! { "_id": id }, car_edit(input)?, Self::return_updated())
            .await
            .map_err(backend("Failed to update car"))?
            .map(|doc| doc.car))
    }

    async fn push_car_images(
        &self,
        id: &str,
        urls: &[String],
    ) -> Result<Option<Car>, StoreError> {
        let update = doc! {
            "$push": { "car.images": { "$each": urls.to_vec() } },
            "$set": { "car.updatedAt": now_bson()? },
        };
        Ok(self
            .car_collection
            .find_one_and_update(doc! { "_id": id }, update, Self::return_updated())
            .await
            .map_err(backend("Failed to add car images"))?
            .map(|doc| doc.car))
    }

    async fn delete_car(&self, id: &str) -> Result<(), StoreError> {
        let result = self
            .car_collection
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(backend("Failed to delete car"))?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("Car"));
        }
        Ok(())
    }

    async fn transition_car(
        &self,
        id: &str,
        from: CarStatus,
        to: CarStatus,
    ) -> Result<Option<Car>, StoreError> {
        Ok(self
            .car_collection
            .find_one_and_update(
                doc! { "_id": id, "car.status": status_bson(from)? },
                doc! { "$set": { "car.status": status_bson(to)?, "car.updatedAt": now_bson()? } },
                Self::return_updated(),
            )
            .await
            .map_err(backend("Failed to update car status"))?
            .map(|doc| doc.car))
    }

    async fn brands(&self) -> Result<Vec<String>, StoreError> {
        let values = self
            .car_collection
            .distinct("car.brand", None, None)
            .await
            .map_err(backend("Failed to list brands"))?;
        let mut brands: Vec<String> = values
            .into_iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();
        brands.sort();
        brands.dedup();
        Ok(brands)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), StoreError> {
        self.order_collection
            .insert_one(Self::order_to_doc(order), None)
            .await
            .map_err(backend("Failed to insert order"))?;
        Ok(())
    }

    async fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self
            .order_collection
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(backend("Failed to query order"))?
            .map(|doc| doc.order))
    }

    async fn list_orders(&self, user_id: Option<&str>) -> Result<Vec<Order>, StoreError> {
        let filter = user_id.map(|uid| doc! { "user_id": uid });
        let mut cursor = self
            .order_collection
            .find(filter, Self::newest_first())
            .await
            .map_err(backend("Failed to list orders"))?;
        let mut orders = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(backend("Failed to read order document"))?
        {
            orders.push(doc.order);
        }
        Ok(orders)
    }

    async fn replace_order(&self, order: &Order) -> Result<(), StoreError> {
        let result = self
            .order_collection
            .replace_one(doc! { "_id": &order.id }, Self::order_to_doc(order), None)
            .await
            .map_err(backend("Failed to replace order"))?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("Order"));
        }
        Ok(())
    }

    async fn ping(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::car::tests::sample_input;
    use crate::models::{FuelType, Role};

    /// Converting a User to a MongoDB document keeps the lookup keys in sync.
    #[test]
    fn test_user_doc_conversion() {
        let user = User::new("Test".into(), "t@example.com".into(), None, Role::Customer);
        let doc = MongoDBStore::user_to_doc(&user, "hash");
        assert_eq!(doc._id, user.id);
        assert_eq!(doc.email, user.email);
        assert!(doc.favorites.is_empty());
        let record = MongoDBStore::doc_to_record(doc);
        assert_eq!(record.user, user);
        assert_eq!(record.password_hash, "hash");
    }

    #[test]
    fn test_car_doc_uses_creation_time_for_sorting() {
        let car = Car::from_input(sample_input("Kia", "Rio", 2021, 1));
        let doc = MongoDBStore::car_to_doc(&car);
        assert_eq!(doc._id, car.id);
        assert_eq!(
            doc.created_ms,
            car.created_at.map(|t| t.timestamp_millis()).unwrap_or_default()
        );
    }

    #[test]
    fn test_car_edit_leaves_status_alone_unless_asked() {
        let update = car_edit(&sample_input(" Kia ", "Rio", 2021, 1)).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("car.brand").unwrap(), "Kia");
        assert!(!set.contains_key("car.status"));
        assert!(!set.contains_key("car.images"));
        assert!(set.contains_key("car.updatedAt"));
        let unset = update.get_document("$unset").unwrap();
        assert!(unset.contains_key("car.vin"));
        assert!(!unset.contains_key("car.color"));

        let mut sold = sample_input("Kia", "Rio", 2021, 1);
        sold.status = Some(CarStatus::Sold);
        let update = car_edit(&sold).unwrap();
        assert_eq!(
            update.get_document("$set").unwrap().get_str("car.status").unwrap(),
            "sold"
        );
    }

    #[test]
    fn test_empty_query_is_empty_filter() {
        assert!(car_filter(&CarQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn test_filter_combines_ranges_and_enums() {
        let query = CarQuery {
            brand: Some("Mercedes-Benz".into()),
            year_from: Some(2010),
            year_to: Some(2020),
            price_max: Some(1_000_000),
            fuel_type: Some(FuelType::Diesel),
            ..Default::default()
        };
        let filter = car_filter(&query).unwrap();
        assert_eq!(
            filter.get_document("car.year").unwrap(),
            &doc! { "$gte": 2010, "$lte": 2020 }
        );
        assert_eq!(
            filter.get_document("car.price").unwrap(),
            &doc! { "$lte": 1_000_000_i64 }
        );
        assert_eq!(filter.get_str("car.fuelType").unwrap(), "diesel");
        match filter.get("car.brand") {
            Some(Bson::RegularExpression(re)) => {
                assert_eq!(re.pattern, "^Mercedes-Benz$");
                assert_eq!(re.options, "i");
            }
            other => panic!("unexpected brand filter: {:?}", other),
        }
    }

    #[test]
    fn test_escape_regex() {
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("Rio"), "Rio");
    }
}
