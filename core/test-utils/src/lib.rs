//! Mock servers and fixtures shared by the tests of the workspace crates.

pub mod cluster;
pub mod fixtures;
pub mod hub;
pub mod server;
