//! stackcost library
//!
//! Estimates the monthly AWS cost of an infrastructure template before it is
//! deployed, scaled by a coarse usage profile. The pipeline is: parse the
//! template into resources, estimate monthly usage per resource, price each
//! estimate against the AWS Price List feed (through a persistent TTL cache),
//! and aggregate everything into a `TemplateAnalysis`.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod pricing;
pub mod render;
pub mod retry;
pub mod template;
pub mod usage;

// Re-export commonly used types
pub use analyzer::{CostAnalyzer, TemplateAnalysis};
pub use template::Resource;
pub use usage::{ResourceUsage, UsageProfile};
