//! Host application that feeds recorded vision results through the statistics engine and reports
//! the resulting diagnostics on the telemetry bus.

pub mod config;
pub mod node;
pub mod runner;
