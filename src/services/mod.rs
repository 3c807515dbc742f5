// src/services/mod.rs
pub mod charts;
pub mod constituents;
pub mod dashboard;
pub mod macro_data;
pub mod market_data;
pub mod sector;
