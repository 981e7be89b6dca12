//! CLI command implementations.

pub mod init;
pub mod registry;
pub mod serve;
