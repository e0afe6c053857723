use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Longest free-text note accepted with an order.
pub const MAX_NOTES_LEN: usize = 500;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    CreditCard,
    Installment,
    BankTransfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::CreditCard,
        PaymentMethod::Installment,
        PaymentMethod::BankTransfer,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::CreditCard => "Card",
            PaymentMethod::Installment => "Installment",
            PaymentMethod::BankTransfer => "Bank transfer",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct DeliveryAddress {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub house: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
}

/// Body of `POST /api/orders`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub car_id: String,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub delivery_address: DeliveryAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Field path -> message, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<&'static str, &'static str>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&'static str> {
        self.0.get(field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    fn insert(&mut self, field: &'static str, message: &'static str) {
        self.0.insert(field, message);
    }

    pub fn first_message(&self) -> Option<&'static str> {
        // Report in form order, not alphabetical order.
        const ORDER: [&str; 5] = [
            "paymentMethod",
            "deliveryAddress.city",
            "deliveryAddress.street",
            "deliveryAddress.house",
            "notes",
        ];
        ORDER.iter().find_map(|field| self.get(field))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message().unwrap_or("Invalid form"))
    }
}

impl std::error::Error for FormErrors {}

impl OrderRequest {
    /// Validates the checkout form. Every failing field is reported.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.payment_method.is_none() {
            errors.insert("paymentMethod", "Select a payment method");
        }
        let address = &self.delivery_address;
        if address.city.trim().is_empty() {
            errors.insert("deliveryAddress.city", "City is required");
        }
        if address.street.trim().is_empty() {
            errors.insert("deliveryAddress.street", "Street is required");
        }
        if address.house.trim().is_empty() {
            errors.insert("deliveryAddress.house", "House is required");
        }
        if self
            .notes
            .as_deref()
            .is_some_and(|notes| notes.chars().count() > MAX_NOTES_LEN)
        {
            errors.insert("notes", "Notes must be at most 500 characters");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub car_id: String,
    pub payment_method: PaymentMethod,
    pub delivery_address: DeliveryAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub total_price: i64,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a pending order from an already validated request.
    pub fn new(
        user_id: String,
        request: OrderRequest,
        payment_method: PaymentMethod,
        total_price: i64,
    ) -> Self {
        let now = Utc::now();
        Order {
            id: ObjectId::new().to_hex(),
            user_id,
            car_id: request.car_id,
            payment_method,
            delivery_address: request.delivery_address,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            total_price,
            status: OrderStatus::Pending,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Body of `PATCH /api/orders/{id}/status`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}
