//! HTTP handlers, one module per resource.

pub mod games;
pub mod health;
pub mod metrics;
