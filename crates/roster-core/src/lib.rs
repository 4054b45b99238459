//! roster-core library.
//!
//! Directory snapshots flow through the crate in one direction:
//! [`flatten`] turns nested member records into flat rows, [`store`] keeps
//! every run in a single schema-frozen table, [`diff`] compares the latest
//! run with the one before it, and [`aggregate`] rolls the whole history up
//! into category and weekly tables.
//!
//! # Conventions
//!
//! - **Errors**: core operations return [`error::Result`]; config loading
//!   uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod aggregate;
pub mod config;
pub mod diff;
pub mod error;
pub mod flatten;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod value;

pub use error::{ErrorCode, ErrorKind, Result, RosterError};
