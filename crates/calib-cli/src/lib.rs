//! Library side of the `calib` command-line tool.

#![deny(unsafe_code)]

pub mod commands;
pub mod logging;
pub mod types;
