//! Record database
//!
//! SQLite stand-in for the document database: one row per vehicle record
//! (keyed by the vehicle doc id) and one row per manual chunk below it.

pub mod chunks;
pub mod init;

pub use chunks::*;
pub use init::*;
