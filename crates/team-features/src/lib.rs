// Library root: re-exports all modules so integration tests and the binary
// can access the crate's public API.

pub mod builder;
pub mod cleaning;
pub mod config;
pub mod features;
pub mod io;
pub mod schema;
