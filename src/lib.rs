//! Library exports for autosalon, shared between the binary and tests.

pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod routes;
pub mod startup;
pub mod state;
pub mod store;
pub mod uploads;
pub mod utils;
pub mod view;
