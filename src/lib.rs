pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod rules;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod utils;
