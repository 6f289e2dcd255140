//! CLI command implementations

pub mod chat;
pub mod k8s;
pub mod logs;
pub mod metrics;
