//! Core translation gateway: caching, rate limiting and provider dispatch

pub mod cache;
pub mod config;
pub mod errors;
pub mod mock;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod rate_limiter;
