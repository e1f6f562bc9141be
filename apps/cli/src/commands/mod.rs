//! Command implementations for the Storecast CLI.

pub mod batch;
pub mod health;
pub mod inspect;
pub mod predict;
