//! Library side of the `variants` command-line driver.

pub mod catalog;
pub mod logging;
pub mod plan;
pub mod report;
