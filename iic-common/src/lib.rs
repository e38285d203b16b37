//! Common components and data for IIC crates.

pub mod config;
#[cfg(feature = "logging")]
pub mod logging;
