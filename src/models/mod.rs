pub mod account;
pub mod car;
pub mod envelope;
pub mod order;
pub mod user;

// Re-export the model types so code outside can do "use crate::models::{Car, User};"
pub use account::{AuthPayload, FavoriteRequest, LoginRequest, ProfileUpdate, RegisterRequest};
pub use car::{Car, CarInput, CarQuery, CarStatus, FuelType, Transmission};
pub use envelope::Envelope;
pub use order::{
    DeliveryAddress, FormErrors, Order, OrderRequest, OrderStatus, OrderStatusUpdate,
    PaymentMethod,
};
pub use user::{AdminUser, Claims, Role, User};
