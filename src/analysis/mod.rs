//! Analysis modules.
//!
//! Delay aggregation over route-matrix results, and heatmap assembly.

pub mod aggregator;
pub mod heatmap;

pub use aggregator::hub_delay_report;
pub use heatmap::build_heatmap;
