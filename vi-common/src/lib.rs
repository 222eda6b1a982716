//! # VI Common Library
//!
//! Shared code for the vehicle-instructions media services:
//! - Error types
//! - Bootstrap configuration and root folder resolution
//! - Tracing initialization
//! - Org / vehicle identity types
//! - Object storage abstraction (filesystem and in-memory buckets)
//! - In-process message bus (topic publish/subscribe)
//! - Record database (vehicles and manual chunks)

pub mod bus;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod storage;
pub mod vehicle;

pub use error::{Error, Result};
pub use vehicle::{OrgId, VehicleKey};
