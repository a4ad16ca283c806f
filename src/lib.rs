//! Discovers the tables of a MySQL or SQLite database at startup and serves
//! list/get/create/update/delete over all of them through one JSON surface.

pub mod libs;

pub use libs::*;
