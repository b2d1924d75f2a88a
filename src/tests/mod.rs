//! # Test Suites for Tide Sampler
//!
//! Cross-module tests driven through the library's public API: sampling
//! properties of the interpolation engine, the query controller's fetch
//! lifecycle, and command line parsing.

mod cli_tests;
mod engine_tests;
