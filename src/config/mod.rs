// src/config/mod.rs
// Process configuration read from the environment (and `.env`).

pub mod scan;

pub use scan::ScanConfig;
