//! Dog Days: sales analytics and customer segmentation for a pet-food store
//!
//! Loads a sales export with Polars, derives dashboard views, scores
//! customers with RFM (Recency, Frequency, Monetary) segmentation and
//! renders charts with Plotters.

pub mod cli;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod generator;
pub mod rfm;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_sales, SalesFilter, SalesFrame};
pub use error::{RfmError, RfmResult};
pub use rfm::{compute_rfm, segment_distribution, segment_summaries, CustomerRfm, Segment, Transaction};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
