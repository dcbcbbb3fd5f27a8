//! ParcelView Library
//!
//! Looks up Queensland and New South Wales cadastral parcels by lot/plan
//! code, reshapes the results as GeoJSON, and exports selections as KML or
//! zipped Shapefiles. The `web` feature adds the HTTP server and embedded
//! frontend.

// Module declarations
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod export;
pub mod lookup;
pub mod map;
pub mod models;
pub mod panel;
pub mod session;
#[cfg(feature = "web")]
pub mod web;
