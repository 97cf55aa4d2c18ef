//! Library components of the column matcher CLI.

pub mod ingest;
pub mod logging;
pub mod settings;
