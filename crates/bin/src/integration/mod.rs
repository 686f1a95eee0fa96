//! Glue between the command line and the library crates: where the download
//! cache lives and how the survey is fetched with a progress bar.

pub(crate) mod cache_manager;
pub(crate) mod loader;
