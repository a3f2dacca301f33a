//! Spatial index integration tests
//!
//! Drive the index manager the way a host record store does: introduce
//! types, write and remove entries, scan and filter.

#[path = "../common/mod.rs"]
mod common;

mod agreement;
mod concurrency;
mod config;
mod manager;
mod shapes;
