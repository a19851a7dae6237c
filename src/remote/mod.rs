pub mod client;
pub mod languages;
pub mod models;
