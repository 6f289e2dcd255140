//! CloudShop AI-Ops bot
//!
//! HTTP front end over `ops-lib`: reporting and action routes, the chat
//! router, the tool adapter, health checks and Prometheus metrics.

pub mod api;
pub mod config;
