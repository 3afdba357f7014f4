pub mod auth;
pub mod config;
pub mod jobs;
pub mod lifecycle;
pub mod service;
pub mod store;
pub mod telemetry;
