//! HTTP API: configuration, routing, authentication and error mapping.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
