//! Property-based test suite entry point.

mod ranking_tests;
mod safety_tests;
