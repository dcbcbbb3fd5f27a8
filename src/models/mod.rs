//! Data models for parcel identifiers, features and styling.
//!
//! This module contains the core data structures shared by the lookup
//! client, the exporters, the web API and the client-side session.
//! Models are designed to be independent of transport and UI.

pub mod feature;
pub mod lot_plan;
pub mod rgb;
pub mod style;

// Re-export all model types
pub use feature::{Feature, FeatureCollection, Geometry, Position, Ring};
pub use lot_plan::{IdentifierError, Jurisdiction, LotPlan};
pub use rgb::RgbColor;
pub use style::{Style, StyleUpdate, MAX_OUTLINE_WEIGHT};
