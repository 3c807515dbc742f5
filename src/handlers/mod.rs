// src/handlers/mod.rs
pub mod admin;
pub mod constituents;
pub mod dashboard;
pub mod error;
