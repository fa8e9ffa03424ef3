//! Moviehub - movie metadata aggregation
//!
//! This library crate exposes the core functionality for integration testing.

pub mod cache;
pub mod config;
pub mod llm;
pub mod metadata;
pub mod orchestrator;
pub mod retry;
pub mod server;
pub mod tools;
pub mod watchlist;
