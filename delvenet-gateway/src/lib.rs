//! Library facade for the `delvenet-gateway` binary.
//!
//! Re-exporting the config loader and service logic lets integration tests
//! and examples drive full protocol rounds without the CLI entrypoint.

pub mod config;
pub mod service;
