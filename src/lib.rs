pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixture;
pub mod geo;
pub mod models;
pub mod observability;
pub mod state;
