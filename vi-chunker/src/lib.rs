//! vi-chunker library interface
//!
//! Splits a vehicle manual into paragraph-bounded chunks and stores them as
//! the vehicle's ordered chunk set.

pub mod chunker;
pub mod credentials;
pub mod error;
pub mod seed;

pub use crate::chunker::{chunkify, ChunkOptions};
pub use crate::error::{ChunkerError, Result};
