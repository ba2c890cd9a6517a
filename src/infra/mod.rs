//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod http;
pub mod relay;
pub mod sheets;
pub mod store;
pub mod telemetry;
