//! Data models for receipts, products and pantry entries.

pub mod config;
pub mod pantry;
pub mod product;
pub mod receipt;
