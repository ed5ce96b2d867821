//! AgriChain QR library crate.
//!
//! Signed, time-bound QR payloads for supply-chain product verification,
//! plus the HTTP surface and product catalog used by the dashboard.

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod qr;
pub mod render;
