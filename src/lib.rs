//! Shelf Compliance: planogram auditing from product detections
//!
//! Compares the products an object detector found in one shelf photograph
//! against the planogram and reports, per product, whether it is correct,
//! missing, on the wrong shelf, on the wrong tray, or out of slot order.
//!
//! ## Architecture
//!
//! - **Engine**: deterministic classification core (shelf vote, presence,
//!   k-means tray bands, tray and slot-order checks)
//! - **Reference**: planogram CSV loader
//! - **Provider**: detection sources (hosted workflow, fixtures)
//! - **API**: axum service exposing the engine over HTTP

pub mod api;
pub mod config;
pub mod engine;
pub mod provider;
pub mod reference;
pub mod types;

// Re-export configuration
pub use config::ShelfConfig;

// Re-export the engine entry points
pub use engine::{audit, classify, cluster_report, ClassifyError, EngineParams, FindingPolicy, ShelfAudit};

// Re-export commonly used types
pub use types::{
    to_alerts, AlertView, BoundingBox, Detection, Finding, FindingCategory, ReferenceEntry,
};
