pub mod audio;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod playback;

pub use error::*;
pub use models::*;

#[cfg(test)]
mod integration_tests;
