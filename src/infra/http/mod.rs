//! HTTP surfaces: the public content API and the admin editor API.

pub mod admin;
pub mod error;
pub mod middleware;
pub mod public;
pub mod rate_limit;

pub use admin::{AdminState, build_admin_router};
pub use public::{PublicState, build_public_router};
pub use rate_limit::ClientRateLimiter;
