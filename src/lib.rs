//! Caching client for the WakaTime API.
//!
//! Every resource is served through a [`Loader`]: cached data is returned
//! while it is fresh, refreshed from the network once the [`RateLimiter`]
//! says it is due, and kept (with the error attached) when a refresh fails.

pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod rate_limiter;
pub mod remote;
pub mod repository;
pub mod result;
pub mod store;

pub use config::Config;
pub use error::Error;
pub use loader::Loader;
pub use rate_limiter::RateLimiter;
pub use repository::WakaClient;
pub use result::LoadResult;
