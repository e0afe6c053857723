//! The checkout dialog on the car page.

use crate::models::{DeliveryAddress, FormErrors, OrderRequest, PaymentMethod};

/// Raw checkout form input, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderForm {
    pub payment_method: Option<PaymentMethod>,
    pub city: String,
    pub street: String,
    pub house: String,
    pub apartment: String,
    pub notes: String,
}

impl OrderForm {
    /// Build the request for `car_id`, or every field error found.
    pub fn to_request(&self, car_id: &str) -> Result<OrderRequest, FormErrors> {
        let optional = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        let request = OrderRequest {
            car_id: car_id.to_string(),
            payment_method: self.payment_method,
            delivery_address: DeliveryAddress {
                city: self.city.trim().to_string(),
                street: self.street.trim().to_string(),
                house: self.house.trim().to_string(),
                apartment: optional(&self.apartment),
            },
            notes: optional(&self.notes),
        };
        request.validate()?;
        Ok(request)
    }
}
