//! Observability module for the reports service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
