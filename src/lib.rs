// src/lib.rs
pub mod types;
pub mod config;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod providers;
pub mod normalize;
pub mod fetch;
pub mod bucket;
pub mod align;
pub mod derive;
pub mod summary;
pub mod cache;
pub mod dashboard;
pub mod web;
